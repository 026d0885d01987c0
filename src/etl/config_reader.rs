use snafu::prelude::*;

use crate::etl::*;

use serde::{Deserialize, Serialize};
use serde_json::Value as JSValue;

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(rename = "outputPath")]
    pub output_path: Option<String>,
    #[serde(rename = "referencePath")]
    pub reference_path: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct FileSource {
    #[serde(rename = "filePath")]
    pub file_path: String,
    #[serde(rename = "firstRowIndex")]
    _first_row_index: Option<JSValue>,
    #[serde(rename = "excelWorksheetName")]
    pub excel_worksheet_name: Option<String>,
}

impl FileSource {
    pub fn new(file_path: &str) -> FileSource {
        FileSource {
            file_path: file_path.to_string(),
            _first_row_index: None,
            excel_worksheet_name: None,
        }
    }

    pub fn with_first_row_index(self, first_row_index: Option<usize>) -> FileSource {
        FileSource {
            _first_row_index: first_row_index.map(JSValue::from),
            ..self
        }
    }

    pub fn with_excel_worksheet_name(self, name: Option<String>) -> FileSource {
        FileSource {
            excel_worksheet_name: name,
            ..self
        }
    }

    /// The 1-based index of the header row (1 when not specified).
    pub fn first_row_index(&self) -> EtlResult<usize> {
        if self._first_row_index.is_none() {
            return Ok(1);
        }
        let x = read_js_int(&self._first_row_index)?;
        ensure!(
            x >= 1,
            ParsingJsonNumberSnafu {
                content: format!("firstRowIndex {}", x)
            }
        );
        Ok(x)
    }
}

/// A processing job: files of one source type and where to put the result.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    #[serde(rename = "sourceType")]
    pub source_type: String,
    #[serde(rename = "fileSources")]
    pub file_sources: Vec<FileSource>,
    #[serde(rename = "outputSettings", default)]
    pub output_settings: OutputSettings,
}

pub fn read_job_config(path: &str) -> EtlResult<JobConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let config: JobConfig = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    debug!("read_job_config: {:?}", config);
    Ok(config)
}

/// A reference output, with the line endings normalized.
pub fn read_reference(path: &str) -> EtlResult<String> {
    let contents = fs::read_to_string(path).context(OpeningFileSnafu { path })?;
    Ok(normalize_newlines(&contents))
}

fn read_js_int(x: &Option<JSValue>) -> EtlResult<usize> {
    match x {
        Some(JSValue::Number(n)) => n.as_u64().map(|x| x as usize).context(ParsingJsonNumberSnafu {
            content: n.to_string(),
        }),
        Some(JSValue::String(s)) => s.trim().parse::<usize>().ok().context(ParsingJsonNumberSnafu {
            content: s.clone(),
        }),
        x => None.context(ParsingJsonNumberSnafu {
            content: format!("{:?}", x),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_job_config() {
        let js = r#"{
            "sourceType": "FINBRA",
            "fileSources": [
                {"filePath": "finbra_2020.csv", "firstRowIndex": 4},
                {"filePath": "finbra_2021.xlsx", "firstRowIndex": "2", "excelWorksheetName": "Receitas"},
                {"filePath": "finbra_2022.csv"}
            ],
            "outputSettings": {"outputPath": "out.csv"}
        }"#;
        let config: JobConfig = serde_json::from_str(js).unwrap();
        assert_eq!(config.source_type, "FINBRA");
        assert_eq!(config.file_sources[0].first_row_index().unwrap(), 4);
        assert_eq!(config.file_sources[1].first_row_index().unwrap(), 2);
        assert_eq!(
            config.file_sources[1].excel_worksheet_name,
            Some("Receitas".to_string())
        );
        assert_eq!(config.file_sources[2].first_row_index().unwrap(), 1);
        assert_eq!(
            config.output_settings.output_path,
            Some("out.csv".to_string())
        );
        assert_eq!(config.output_settings.reference_path, None);
    }

    #[test]
    fn output_settings_are_optional() {
        let js = r#"{"sourceType": "SNIS", "fileSources": []}"#;
        let config: JobConfig = serde_json::from_str(js).unwrap();
        assert_eq!(config.output_settings, OutputSettings::default());
    }

    #[test]
    fn invalid_first_row_index() {
        let fs = FileSource::new("a.csv").with_first_row_index(Some(0));
        assert!(matches!(
            fs.first_row_index(),
            Err(EtlError::ParsingJsonNumber { .. })
        ));
        let js = r#"{"filePath": "a.csv", "firstRowIndex": "abc"}"#;
        let fs: FileSource = serde_json::from_str(js).unwrap();
        assert!(fs.first_row_index().is_err());
    }
}
