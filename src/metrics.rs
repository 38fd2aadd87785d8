use hdrhistogram::Histogram;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fmt::Write;
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct Counters {
    requests: u64,
    errors: u64,
    unrecognized_symptoms: u64,
    predictions: BTreeMap<String, u64>,
}

pub struct Metrics {
    started: Instant,
    latency: Mutex<Histogram<u64>>, // micros
    counters: Mutex<Counters>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            latency: Mutex::new(Histogram::new(3).expect("3 significant figures is a valid precision")),
            counters: Mutex::new(Counters::default()),
        }
    }

    pub fn observe_request(&self, dur: Duration) {
        let micros = dur.as_micros().min(u64::MAX as u128) as u64;
        let _ = self.latency.lock().record(micros);
        self.counters.lock().requests += 1;
    }

    pub fn observe_prediction(&self, disease: &str, unrecognized: usize) {
        let mut c = self.counters.lock();
        *c.predictions.entry(disease.to_string()).or_insert(0) += 1;
        c.unrecognized_symptoms += unrecognized as u64;
    }

    pub fn inc_error(&self) {
        self.counters.lock().errors += 1;
    }

    pub fn format(&self) -> String {
        let (p50, p95, p99) = {
            let h = self.latency.lock();
            (
                h.value_at_quantile(0.50) as f64 / 1000.0,
                h.value_at_quantile(0.95) as f64 / 1000.0,
                h.value_at_quantile(0.99) as f64 / 1000.0,
            )
        };

        let c = self.counters.lock();
        let elapsed = self.started.elapsed().as_secs_f64().max(1.0);
        let qps = c.requests as f64 / elapsed;

        let mut out = format!(
            "qps {:.2}\nrequests {}\nerrors {}\nunrecognized_symptoms {}\np50_ms {:.3}\np95_ms {:.3}\np99_ms {:.3}\n",
            qps, c.requests, c.errors, c.unrecognized_symptoms, p50, p95, p99
        );
        for (disease, count) in &c.predictions {
            let _ = writeln!(out, "predictions{{disease=\"{}\"}} {}", disease, count);
        }
        out
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
