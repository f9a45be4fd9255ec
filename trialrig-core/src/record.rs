use serde::{Deserialize, Serialize};

use crate::response::ResponseEvent;
use crate::trial::{TerminationReason, TrialKind};

/// Item center as percentages of the display area.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Position) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Sealed result of one trial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub kind: TrialKind,
    /// Video sources or displayed images.
    pub stimulus: Vec<String>,
    pub events: Vec<ResponseEvent>,
    pub correct: Option<bool>,
    pub ended_at_ms: u64,
    pub ended_by: TerminationReason,
    pub placement: Option<Vec<Position>>,
}

impl ResponseRecord {
    pub fn first_response(&self) -> Option<&ResponseEvent> {
        self.events.first()
    }

    pub fn responded(&self) -> bool {
        !self.events.is_empty()
    }

    /// Shape handed to persistence.
    pub fn export(&self) -> ExportedRecord {
        match self.kind {
            TrialKind::Video => {
                let responded = self.responded();
                ExportedRecord::Video(VideoData {
                    rt: responded.then(|| self.events.iter().map(|e| e.rt_ms).collect()),
                    stimulus: self.stimulus.clone(),
                    response: responded.then(|| self.events.iter().map(|e| e.choice.label()).collect()),
                    video_time: responded.then(|| {
                        self.events
                            .iter()
                            .map(|e| e.stimulus_time.unwrap_or_default())
                            .collect()
                    }),
                })
            }
            TrialKind::VisualSearch => {
                let first = self.first_response();
                ExportedRecord::Search(SearchData {
                    rt: first.map(|e| e.rt_ms),
                    response: first.map(|e| e.choice.label()),
                    correct: self.correct.unwrap_or(false),
                    clicked_index: first.and_then(|e| e.choice.item_index()),
                    images: self.stimulus.clone(),
                    image_positions: self.placement.clone().unwrap_or_default(),
                })
            }
        }
    }
}

/// Persisted trial data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExportedRecord {
    Video(VideoData),
    Search(SearchData),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoData {
    pub rt: Option<Vec<u64>>,
    pub stimulus: Vec<String>,
    pub response: Option<Vec<String>>,
    /// Seconds into the video at each response.
    pub video_time: Option<Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchData {
    pub rt: Option<u64>,
    pub response: Option<String>,
    pub correct: bool,
    pub clicked_index: Option<usize>,
    pub images: Vec<String>,
    pub image_positions: Vec<Position>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::Choice;
    use serde_json::json;

    fn search_record(choice: Choice, correct: bool) -> ResponseRecord {
        ResponseRecord {
            kind: TrialKind::VisualSearch,
            stimulus: vec!["d1.png".into(), "d2.png".into()],
            events: vec![ResponseEvent::new(612, choice)],
            correct: Some(correct),
            ended_at_ms: 612,
            ended_by: TerminationReason::Response,
            placement: Some(vec![Position::new(10.0, 20.0), Position::new(50.0, 50.0)]),
        }
    }

    #[test]
    fn absent_click_exports_null_index() {
        let exported = serde_json::to_value(search_record(Choice::Absent, true).export()).unwrap();
        assert_eq!(
            exported,
            json!({
                "rt": 612,
                "response": "absent",
                "correct": true,
                "clicked_index": null,
                "images": ["d1.png", "d2.png"],
                "image_positions": [{"x": 10.0, "y": 20.0}, {"x": 50.0, "y": 50.0}],
            })
        );
    }

    #[test]
    fn video_record_exports_sequences() {
        let record = ResponseRecord {
            kind: TrialKind::Video,
            stimulus: vec!["clip.mp4".into()],
            events: vec![
                ResponseEvent::new(480, Choice::key("f")).at_stimulus_time(0.48),
                ResponseEvent::new(1130, Choice::key("j")).at_stimulus_time(1.13),
            ],
            correct: None,
            ended_at_ms: 5000,
            ended_by: TerminationReason::StimulusEnded,
            placement: None,
        };
        let exported = serde_json::to_value(record.export()).unwrap();
        assert_eq!(exported["rt"], json!([480, 1130]));
        assert_eq!(exported["response"], json!(["f", "j"]));
        assert_eq!(exported["video_time"], json!([0.48, 1.13]));
        assert!(exported.get("correct").is_none());
    }

    #[test]
    fn unanswered_video_exports_nulls() {
        let record = ResponseRecord {
            kind: TrialKind::Video,
            stimulus: vec!["clip.webm".into()],
            events: Vec::new(),
            correct: None,
            ended_at_ms: 2000,
            ended_by: TerminationReason::Timeout,
            placement: None,
        };
        let exported = serde_json::to_value(record.export()).unwrap();
        assert!(exported["rt"].is_null());
        assert!(exported["response"].is_null());
        assert!(exported["video_time"].is_null());
    }

    #[test]
    fn distance_is_euclidean() {
        let a = Position::new(0.0, 0.0);
        let b = Position::new(3.0, 4.0);
        assert!((a.distance(&b) - 5.0).abs() < f64::EPSILON);
    }
}
