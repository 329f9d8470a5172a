use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// File id used for the single record a merge produces.
pub const MERGED_FILE_ID: &str = "merged";
/// File name used for the single record a merge produces.
pub const MERGED_FILE_NAME: &str = "merged_document.pdf";

/// Outcome of one unit of work: one file under one payload, or the whole
/// merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    pub file_id: String,
    pub file_name: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
    /// Total bytes written, summed over all parts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_size: Option<u64>,
    /// Milliseconds spent on the unit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_time: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl BatchResult {
    pub fn success(
        file_id: &str,
        file_name: &str,
        output_path: PathBuf,
        output_size: u64,
        processing_time: u64,
    ) -> Self {
        Self {
            file_id: file_id.to_string(),
            file_name: file_name.to_string(),
            success: true,
            output_path: Some(output_path),
            output_size: Some(output_size),
            processing_time: Some(processing_time),
            error: None,
            warnings: vec![],
        }
    }

    pub fn failure(file_id: &str, file_name: &str, error: String) -> Self {
        Self {
            file_id: file_id.to_string(),
            file_name: file_name.to_string(),
            success: false,
            output_path: None,
            output_size: None,
            processing_time: None,
            error: Some(error),
            warnings: vec![],
        }
    }

    pub fn with_processing_time(mut self, millis: u64) -> Self {
        self.processing_time = Some(millis);
        self
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_success() {
        let result = BatchResult::success(
            "f1",
            "report.pdf",
            PathBuf::from("report_watermarked.pdf"),
            2048,
            12,
        );
        assert!(result.success);
        assert_eq!(result.output_size, Some(2048));
        assert!(result.error.is_none());
    }

    #[test]
    fn test_result_failure_serialization() {
        let result = BatchResult::failure("f2", "Unknown", "File not found".to_string())
            .with_processing_time(0);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["fileId"], "f2");
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "File not found");
        assert!(json.get("outputPath").is_none());
        assert!(json.get("warnings").is_none());
    }
}
