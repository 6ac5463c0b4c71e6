//! Scripted weather source for store tests.

#![allow(dead_code)]

use async_trait::async_trait;
use nowcast_core::{
    Coordinate, FetchError, Units, WeatherRequest, WeatherSnapshot, WeatherSource,
    source::openweather::decode_current,
};
use parking_lot::Mutex;
use std::collections::VecDeque;
use tokio::sync::oneshot;

pub type Outcome = Result<WeatherSnapshot, FetchError>;

#[derive(Debug)]
enum Step {
    Ready(Outcome),
    Gated(oneshot::Receiver<Outcome>),
    Pending,
}

/// Replies to each `fetch` with the first scripted step that matches its
/// coordinate. Steps pushed without a coordinate match any request.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    steps: Mutex<VecDeque<(Option<Coordinate>, Step)>>,
    calls: Mutex<Vec<WeatherRequest>>,
}

impl ScriptedSource {
    pub fn push_ready(&self, outcome: Outcome) {
        self.push(None, Step::Ready(outcome));
    }

    pub fn push_ready_at(&self, coordinate: Coordinate, outcome: Outcome) {
        self.push(Some(coordinate), Step::Ready(outcome));
    }

    /// The matching fetch waits until a value is sent on the returned sender.
    pub fn push_gated_at(&self, coordinate: Coordinate) -> oneshot::Sender<Outcome> {
        let (tx, rx) = oneshot::channel();
        self.push(Some(coordinate), Step::Gated(rx));
        tx
    }

    pub fn push_gated(&self) -> oneshot::Sender<Outcome> {
        let (tx, rx) = oneshot::channel();
        self.push(None, Step::Gated(rx));
        tx
    }

    /// The matching fetch never returns.
    pub fn push_pending(&self) {
        self.push(None, Step::Pending);
    }

    pub fn calls(&self) -> Vec<WeatherRequest> {
        self.calls.lock().clone()
    }

    fn push(&self, coordinate: Option<Coordinate>, step: Step) {
        self.steps.lock().push_back((coordinate, step));
    }

    fn take(&self, coordinate: Coordinate) -> Option<Step> {
        let mut steps = self.steps.lock();
        let index = steps
            .iter()
            .position(|(wanted, _)| wanted.is_none_or(|c| c == coordinate))?;
        steps.remove(index).map(|(_, step)| step)
    }
}

#[async_trait]
impl WeatherSource for ScriptedSource {
    async fn fetch(&self, coordinate: Coordinate, units: Units) -> Result<WeatherSnapshot, FetchError> {
        self.calls.lock().push(WeatherRequest { coordinate, units });
        let step = self.take(coordinate);

        match step {
            Some(Step::Ready(outcome)) => outcome,
            Some(Step::Gated(rx)) => rx
                .await
                .unwrap_or_else(|_| Err(FetchError::Unknown("gate dropped".to_string()))),
            Some(Step::Pending) => std::future::pending().await,
            None => Err(FetchError::Unknown("no scripted response".to_string())),
        }
    }
}

pub fn body(name: &str, temp: f64) -> serde_json::Value {
    serde_json::json!({
        "coord": {"lon": -0.1278, "lat": 51.5074},
        "weather": [{"id": 500, "main": "Rain", "description": "light rain", "icon": "10d"}],
        "main": {
            "temp": temp,
            "feels_like": temp - 1.0,
            "temp_min": temp - 2.0,
            "temp_max": temp + 2.0,
            "pressure": 1009,
            "humidity": 81
        },
        "visibility": 9000,
        "wind": {"speed": 5.7, "deg": 230, "gust": 9.3},
        "clouds": {"all": 90},
        "dt": 1_700_000_000,
        "sys": {"country": "GB", "sunrise": 1_699_946_000, "sunset": 1_699_978_500},
        "timezone": 0,
        "name": name
    })
}

pub fn snapshot(name: &str, temp: f64) -> WeatherSnapshot {
    decode_current(&body(name, temp).to_string()).expect("fixture should decode")
}
