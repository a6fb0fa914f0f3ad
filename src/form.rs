// Raw form submission as collected by the absence confirmation form

use serde::Deserialize;

use crate::error::AppError;
use crate::record::{AbsenceKind, AbsenceTime, AttendanceRecord, ImageRef};

/// Maximum characters accepted in the reason textarea
pub const REASON_MAX_CHARS: usize = 40;

/// Maximum characters accepted in the details textarea
pub const DETAIL_MAX_CHARS: usize = 80;

/// Widget values before they are turned into an [`AttendanceRecord`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FormSubmission {
    pub location: String,
    pub class_number: String,
    pub name: String,
    /// `YY.MM.DD` or `YYYY-MM-DD`
    pub birth_date: String,
    /// `YYYY-MM-DD` from the date picker
    pub absence_date: String,
    /// "공가" or "사유"
    pub absent_category: String,
    /// "오전", "오후" or "종일"
    pub category: String,
    pub reason: String,
    pub details: String,
    pub place: String,
    pub signature: ImageRef,
    pub document: ImageRef,
}

impl FormSubmission {
    pub fn from_json(json: &str) -> Result<Self, AppError> {
        serde_json::from_str(json).map_err(|e| AppError::RecordError(format!("Invalid JSON: {}", e)))
    }

    pub fn into_record(self) -> Result<AttendanceRecord, AppError> {
        let mut date_parts = self.absence_date.split('-').map(str::to_string);
        let absent_year = date_parts.next().unwrap_or_default();
        let absent_month = date_parts.next().unwrap_or_default();
        let absent_day = date_parts.next().unwrap_or_default();

        let absent_reason = flatten_lines(&self.reason);
        let absent_detail = flatten_lines(&self.details);
        check_length("reason", &absent_reason, REASON_MAX_CHARS)?;
        check_length("details", &absent_detail, DETAIL_MAX_CHARS)?;

        Ok(AttendanceRecord {
            name: self.name,
            birthday: self.birth_date.replace('.', "-"),
            absent_year,
            absent_month,
            absent_day,
            absent_time: parse_time_label(&self.category)?,
            absent_category: parse_kind_label(&self.absent_category)?,
            absent_reason,
            absent_detail,
            absent_place: self.place,
            signature_url: self.signature,
            campus: format!("{} 캠퍼스", self.location),
            class: self.class_number,
            appendix: self.document,
        })
    }
}

fn flatten_lines(text: &str) -> String {
    text.replace("\r\n", " ").replace('\n', " ")
}

fn check_length(field: &str, value: &str, max: usize) -> Result<(), AppError> {
    let len = value.chars().count();
    if len > max {
        return Err(AppError::ContractViolation(format!(
            "{} is {} characters, limit is {}",
            field, len, max
        )));
    }
    Ok(())
}

pub fn parse_time_label(label: &str) -> Result<AbsenceTime, AppError> {
    match label.trim() {
        "오전" => Ok(AbsenceTime::Morning),
        "오후" => Ok(AbsenceTime::Afternoon),
        "종일" => Ok(AbsenceTime::FullDay),
        other => Err(AppError::ContractViolation(format!(
            "unknown absence time label {:?}",
            other
        ))),
    }
}

pub fn parse_kind_label(label: &str) -> Result<AbsenceKind, AppError> {
    match label.trim() {
        "공가" => Ok(AbsenceKind::Official),
        "사유" => Ok(AbsenceKind::Personal),
        other => Err(AppError::ContractViolation(format!(
            "unknown absence category label {:?}",
            other
        ))),
    }
}
