// AttendanceRecord: the value bag handed over by the form step

use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};

use crate::error::AppError;

// ============================================================================
// Category Codes
// ============================================================================

/// Time of day the absence covers. Serialized as its integer code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum AbsenceTime {
    Morning,
    Afternoon,
    FullDay,
}

impl TryFrom<u8> for AbsenceTime {
    type Error = AppError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(AbsenceTime::Morning),
            1 => Ok(AbsenceTime::Afternoon),
            2 => Ok(AbsenceTime::FullDay),
            other => Err(AppError::ContractViolation(format!(
                "absentTime must be 0, 1 or 2, got {}",
                other
            ))),
        }
    }
}

impl From<AbsenceTime> for u8 {
    fn from(time: AbsenceTime) -> u8 {
        match time {
            AbsenceTime::Morning => 0,
            AbsenceTime::Afternoon => 1,
            AbsenceTime::FullDay => 2,
        }
    }
}

/// Official leave (공가) or personal reason (사유).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum AbsenceKind {
    Official,
    Personal,
}

impl TryFrom<u8> for AbsenceKind {
    type Error = AppError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(AbsenceKind::Official),
            1 => Ok(AbsenceKind::Personal),
            other => Err(AppError::ContractViolation(format!(
                "absentCategory must be 0 or 1, got {}",
                other
            ))),
        }
    }
}

impl From<AbsenceKind> for u8 {
    fn from(kind: AbsenceKind) -> u8 {
        match kind {
            AbsenceKind::Official => 0,
            AbsenceKind::Personal => 1,
        }
    }
}

// ============================================================================
// Image References
// ============================================================================

/// Source reference for an overlay image. An empty string means unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageRef(pub String);

/// What an [`ImageRef`] points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource<'a> {
    Unset,
    /// Base64 payload of a `data:` URL.
    DataUrl(&'a str),
    Remote(&'a str),
    /// Asset path, relative to the asset root when it starts with `/`.
    Path(&'a str),
}

impl ImageRef {
    pub fn new(source: impl Into<String>) -> Self {
        ImageRef(source.into())
    }

    pub fn is_unset(&self) -> bool {
        self.0.trim().is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn source(&self) -> Result<ImageSource<'_>, AppError> {
        let s = self.0.trim();
        if s.is_empty() {
            return Ok(ImageSource::Unset);
        }
        if let Some(rest) = s.strip_prefix("data:") {
            let (header, payload) = rest
                .split_once(',')
                .ok_or_else(|| AppError::image(s, "data URL has no payload"))?;
            if !header.ends_with(";base64") {
                return Err(AppError::image(s, "only base64 data URLs are supported"));
            }
            return Ok(ImageSource::DataUrl(payload));
        }
        if s.starts_with("http://") || s.starts_with("https://") {
            return Ok(ImageSource::Remote(s));
        }
        Ok(ImageSource::Path(s))
    }
}

// ============================================================================
// Attendance Record
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub birthday: String,
    #[serde(default)]
    pub absent_year: String,
    #[serde(default)]
    pub absent_month: String,
    #[serde(default)]
    pub absent_day: String,
    pub absent_time: AbsenceTime,
    pub absent_category: AbsenceKind,
    #[serde(default)]
    pub absent_reason: String,
    #[serde(default)]
    pub absent_detail: String,
    #[serde(default)]
    pub absent_place: String,
    #[serde(default)]
    pub signature_url: ImageRef,
    #[serde(default)]
    pub campus: String,
    #[serde(default)]
    pub class: String,
    #[serde(default)]
    pub appendix: ImageRef,
}

impl Default for AttendanceRecord {
    fn default() -> Self {
        AttendanceRecord {
            name: String::new(),
            birthday: String::new(),
            absent_year: String::new(),
            absent_month: String::new(),
            absent_day: String::new(),
            absent_time: AbsenceTime::Morning,
            absent_category: AbsenceKind::Official,
            absent_reason: String::new(),
            absent_detail: String::new(),
            absent_place: String::new(),
            signature_url: ImageRef::default(),
            campus: String::new(),
            class: String::new(),
            appendix: ImageRef::default(),
        }
    }
}

impl AttendanceRecord {
    pub fn from_json(json: &str) -> Result<Self, AppError> {
        serde_json::from_str(json).map_err(|e| AppError::RecordError(format!("Invalid JSON: {}", e)))
    }
}

// ============================================================================
// Record Holder
// ============================================================================

/// Last-write-wins holder passing one record from the form step to rendering.
#[derive(Debug, Default)]
pub struct RecordStore {
    current: RwLock<Arc<AttendanceRecord>>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the current record.
    pub fn get(&self) -> Arc<AttendanceRecord> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    pub fn replace(&self, record: AttendanceRecord) {
        let record = Arc::new(record);
        match self.current.write() {
            Ok(mut guard) => *guard = record,
            Err(poisoned) => *poisoned.into_inner() = record,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = r#"{
        "name": "홍길동",
        "birthday": "1995-05-15",
        "absentYear": "25",
        "absentMonth": "01",
        "absentDay": "11",
        "absentTime": 1,
        "absentCategory": 1,
        "absentReason": "병원 방문",
        "absentDetail": "서울 종합병원 2시간 진료",
        "absentPlace": "서울 강남구",
        "signatureUrl": "/체크.png",
        "campus": "서울 캠퍼스",
        "class": "3-1",
        "appendix": ""
    }"#;

    #[test]
    fn parses_upstream_record_shape() {
        let record = AttendanceRecord::from_json(SAMPLE).unwrap();
        assert_eq!(record.name, "홍길동");
        assert_eq!(record.absent_time, AbsenceTime::Afternoon);
        assert_eq!(record.absent_category, AbsenceKind::Personal);
        assert!(record.appendix.is_unset());
        assert!(!record.signature_url.is_unset());
    }

    #[test]
    fn missing_text_fields_become_empty() {
        let record =
            AttendanceRecord::from_json(r#"{"absentTime": 0, "absentCategory": 0}"#).unwrap();
        assert_eq!(record, AttendanceRecord::default());
    }

    #[test]
    fn invalid_category_codes_are_rejected() {
        let bad_time = SAMPLE.replace("\"absentTime\": 1", "\"absentTime\": 3");
        let err = AttendanceRecord::from_json(&bad_time).unwrap_err();
        assert!(err.to_string().contains("absentTime"), "{}", err);

        let bad_kind = SAMPLE.replace("\"absentCategory\": 1", "\"absentCategory\": 2");
        let err = AttendanceRecord::from_json(&bad_kind).unwrap_err();
        assert!(err.to_string().contains("absentCategory"), "{}", err);

        assert!(AbsenceKind::try_from(7).is_err());
        assert!(AbsenceTime::try_from(255).is_err());
    }

    #[test]
    fn category_codes_serialize_as_integers() {
        let json = serde_json::to_value(AttendanceRecord::default()).unwrap();
        assert_eq!(json["absentTime"], 0);
        assert_eq!(json["absentCategory"], 0);
    }

    #[test]
    fn image_ref_classification() {
        assert_eq!(ImageRef::new("").source().unwrap(), ImageSource::Unset);
        assert_eq!(ImageRef::new("   ").source().unwrap(), ImageSource::Unset);
        assert_eq!(
            ImageRef::new("data:image/png;base64,iVBO").source().unwrap(),
            ImageSource::DataUrl("iVBO")
        );
        assert_eq!(
            ImageRef::new("https://example.com/a.png").source().unwrap(),
            ImageSource::Remote("https://example.com/a.png")
        );
        assert_eq!(
            ImageRef::new("/체크.png").source().unwrap(),
            ImageSource::Path("/체크.png")
        );
        assert!(ImageRef::new("data:image/png,raw").source().is_err());
        assert!(ImageRef::new("data:nothing").source().is_err());
    }

    #[test]
    fn store_replaces_wholesale() {
        let store = RecordStore::new();
        assert_eq!(*store.get(), AttendanceRecord::default());

        let first = AttendanceRecord::from_json(SAMPLE).unwrap();
        store.replace(first.clone());
        let snapshot = store.get();
        assert_eq!(*snapshot, first);

        store.replace(AttendanceRecord {
            name: "김철수".to_string(),
            ..AttendanceRecord::default()
        });
        // Earlier snapshots are unaffected by later writes.
        assert_eq!(snapshot.name, "홍길동");
        assert_eq!(store.get().name, "김철수");
        assert_eq!(store.get().class, "");
    }
}
