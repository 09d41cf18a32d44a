//! Turns filtered combinations into complete, named sub-jobs.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use serde::{ser::SerializeMap, Serialize, Serializer};

use super::{FieldSpec, JobCombination, JobError, Value, DATA_TARGET_KEY};

/// Key the output path is stored under in ledger records.
pub const OUTPUT_PATH_KEY: &str = "output_path";

/// Keys holding the file format: legacy requests use `format`, current
/// ones `data_format`.
const FORMAT_KEYS: [&str; 2] = ["format", "data_format"];

/// One fully specified sub-job.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    /// Zero padded to the width of the total job count.
    pub id: String,
    /// Dataset target, e.g. `reanalysis-era5-pressure-levels`.
    pub target: String,
    /// Request parameters, without the target or output path.
    pub parameters: FieldSpec,
    pub output_path: PathBuf,
}

impl Serialize for Job {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.parameters.len() + 2))?;
        for (name, value) in self.parameters.iter() {
            map.serialize_entry(name, value)?;
        }
        map.serialize_entry(DATA_TARGET_KEY, &self.target)?;
        map.serialize_entry(OUTPUT_PATH_KEY, &self.output_path)?;
        map.end()
    }
}

/// How output file names are chosen.
pub enum Naming<'a> {
    /// `[ID{id}]{values}.{nc|grb}` with the varying values sorted by field name.
    Default,
    /// Caller-supplied; receives the job with its id, target and parameters.
    Custom(&'a dyn Fn(&Job) -> String),
}

/// Builds one job per combination, in the order given.
///
/// `template` must provide `data_target`; with default naming it must
/// also provide a `format` or `data_format`. Two jobs writing to the same
/// path is an error. Nothing is written to `output_dir`.
pub fn materialize(
    template: &FieldSpec,
    combinations: &[JobCombination],
    output_dir: &Path,
    naming: &Naming,
) -> Result<Vec<Job>, JobError> {
    let width = combinations.len().to_string().len();
    let mut jobs = Vec::with_capacity(combinations.len());
    let mut claimed: HashMap<PathBuf, String> = HashMap::new();

    for (index, combination) in combinations.iter().enumerate() {
        let mut parameters = template.clone();
        for (name, value) in combination.pairs() {
            parameters.insert(name.clone(), value.clone());
        }

        let target = match parameters.remove(DATA_TARGET_KEY) {
            Some(Value::Str(target)) => target,
            Some(other) => return Err(JobError::InvalidTarget(other.to_string())),
            None => return Err(JobError::MissingField(DATA_TARGET_KEY.to_string())),
        };

        let mut job = Job {
            id: format!("{:0width$}", index, width = width),
            target,
            parameters,
            output_path: PathBuf::new(),
        };

        let file_name = match naming {
            Naming::Default => default_file_name(&job.id, combination, &job.parameters)?,
            Naming::Custom(name) => name(&job),
        };
        job.output_path = output_dir.join(file_name);

        if let Some(first) = claimed.insert(job.output_path.clone(), job.id.clone()) {
            return Err(JobError::DuplicateOutputPath {
                first,
                second: job.id,
                path: job.output_path.display().to_string(),
            });
        }

        jobs.push(job);
    }

    Ok(jobs)
}

fn default_file_name(
    id: &str,
    combination: &JobCombination,
    parameters: &FieldSpec,
) -> Result<String, JobError> {
    let extension = file_extension(parameters)?;

    let mut pairs: Vec<&(String, Value)> = combination.pairs().iter().collect();
    pairs.sort_by(|a, b| a.0.cmp(&b.0));
    let values: Vec<String> = pairs.iter().map(|(_, value)| value.to_string()).collect();

    Ok(format!("[ID{}]{}.{}", id, values.join("-"), extension))
}

/// `nc` for netcdf, `grb` for anything else.
fn file_extension(parameters: &FieldSpec) -> Result<&'static str, JobError> {
    let format = FORMAT_KEYS
        .iter()
        .find_map(|key| parameters.get(key))
        .ok_or_else(|| JobError::MissingField(FORMAT_KEYS[0].to_string()))?;

    let netcdf = match format {
        Value::List(values) => matches!(values.as_slice(), [only] if only.as_str() == Some("netcdf")),
        other => other.as_str() == Some("netcdf"),
    };

    Ok(if netcdf { "nc" } else { "grb" })
}

/// A file name pattern such as `era5_{variable}_{year}.nc`.
///
/// `{id}` is the job id, any other placeholder is a request field.
/// `{{` and `}}` are literal braces.
#[derive(Debug, Clone, PartialEq)]
pub struct NameTemplate {
    pattern: String,
    parts: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq)]
enum Part {
    Text(String),
    Field(String),
}

impl NameTemplate {
    pub fn parse(pattern: &str) -> Result<Self, JobError> {
        let invalid = || JobError::InvalidNameTemplate(pattern.to_string());
        let mut parts = Vec::new();
        let mut text = String::new();
        let mut chars = pattern.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    text.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    text.push('}');
                }
                '{' => {
                    let mut field = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some('{') | None => return Err(invalid()),
                            Some(c) => field.push(c),
                        }
                    }
                    let field = field.trim().to_string();
                    if field.is_empty() {
                        return Err(invalid());
                    }
                    if !text.is_empty() {
                        parts.push(Part::Text(std::mem::take(&mut text)));
                    }
                    parts.push(Part::Field(field));
                }
                '}' => return Err(invalid()),
                c => text.push(c),
            }
        }
        if !text.is_empty() {
            parts.push(Part::Text(text));
        }

        Ok(NameTemplate {
            pattern: pattern.to_string(),
            parts,
        })
    }

    /// Checks every placeholder names a field that jobs will carry, and
    /// that names differ between jobs: either `{id}` or every field of
    /// `axes` must appear.
    pub fn validate(&self, template: &FieldSpec, axes: &FieldSpec) -> Result<(), JobError> {
        for part in &self.parts {
            if let Part::Field(name) = part {
                let known = name == "id"
                    || name == DATA_TARGET_KEY
                    || template.contains_key(name)
                    || axes.contains_key(name);
                if !known {
                    return Err(JobError::UnknownField(name.clone()));
                }
            }
        }

        if !self.mentions("id") {
            if let Some(field) = axes.keys().find(|field| !self.mentions(field)) {
                return Err(JobError::IncompleteNameTemplate {
                    pattern: self.pattern.clone(),
                    field: field.to_string(),
                });
            }
        }
        Ok(())
    }

    fn mentions(&self, field: &str) -> bool {
        self.parts
            .iter()
            .any(|part| matches!(part, Part::Field(name) if name == field))
    }

    pub fn render(&self, job: &Job) -> String {
        self.parts
            .iter()
            .map(|part| match part {
                Part::Text(text) => text.clone(),
                Part::Field(name) if name == "id" => job.id.clone(),
                Part::Field(name) if name == DATA_TARGET_KEY => job.target.clone(),
                Part::Field(name) => job
                    .parameters
                    .get(name)
                    .map(|value| value.to_string())
                    .unwrap_or_default(),
            })
            .collect()
    }
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{expand, order_combinations};

    fn template() -> FieldSpec {
        [
            ("data_target", Value::from("reanalysis-era5-pressure-levels")),
            ("product_type", Value::from("reanalysis")),
            ("format", Value::from("netcdf")),
            ("variable", Value::from(vec!["geopotential", "specific_humidity"])),
            ("year", Value::from(vec!["1991", "1992", "1993"])),
            ("area", Value::from(vec![10i64, 80, -10, 100])),
        ]
        .into_iter()
        .collect()
    }

    fn axes() -> FieldSpec {
        [
            ("variable", Value::from(vec!["u"])),
            ("year", Value::from(vec![1999i64, 2000])),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn should_name_jobs_by_default() {
        let combinations = order_combinations(expand(&axes()));
        let jobs = materialize(&template(), &combinations, Path::new("/data"), &Naming::Default)
            .unwrap();

        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].output_path, PathBuf::from("/data/[ID0]u-1999.nc"));
        assert_eq!(jobs[1].output_path, PathBuf::from("/data/[ID1]u-2000.nc"));
    }

    #[test]
    fn should_pad_ids_to_job_count_width() {
        let axes: FieldSpec = [
            ("variable", Value::from(vec!["u"])),
            ("year", Value::List((1991..=2000).map(Value::Int).collect())),
        ]
        .into_iter()
        .collect();
        let combinations = order_combinations(expand(&axes));
        let jobs = materialize(&template(), &combinations, Path::new("/data"), &Naming::Default)
            .unwrap();

        let ids: Vec<&str> = jobs.iter().map(|j| j.id.as_str()).collect();
        assert_eq!(ids[0], "00");
        assert_eq!(ids[9], "09");
        assert_eq!(
            jobs[1].output_path,
            PathBuf::from("/data/[ID01]u-1992.nc")
        );
        let mut unique = ids.clone();
        unique.dedup();
        assert_eq!(unique.len(), 10);
    }

    #[test]
    fn should_sort_name_components_by_field() {
        let axes: FieldSpec = [
            ("year", Value::Int(2000)),
            ("variable", Value::from("geopotential")),
            ("pressure_level", Value::Int(700)),
        ]
        .into_iter()
        .collect();
        let mut template = template();
        template.insert("format", "grib");

        let jobs =
            materialize(&template, &expand(&axes), Path::new("out"), &Naming::Default).unwrap();

        assert_eq!(
            jobs[0].output_path,
            PathBuf::from("out/[ID0]700-geopotential-2000.grb")
        );
    }

    #[test]
    fn should_override_template_without_mutating_it() {
        let template = template();
        let combinations = expand(&axes());
        let jobs =
            materialize(&template, &combinations, Path::new("/data"), &Naming::Default).unwrap();

        assert_eq!(jobs[0].target, "reanalysis-era5-pressure-levels");
        assert!(!jobs[0].parameters.contains_key("data_target"));
        assert_eq!(jobs[0].parameters.get("variable"), Some(&Value::from("u")));
        assert_eq!(jobs[0].parameters.get("year"), Some(&Value::Int(1999)));
        assert_eq!(
            jobs[0].parameters.get("area"),
            Some(&Value::from(vec![10i64, 80, -10, 100]))
        );
        assert_eq!(
            template.get("variable"),
            Some(&Value::from(vec!["geopotential", "specific_humidity"]))
        );
    }

    #[test]
    fn should_use_custom_naming() {
        let name = |job: &Job| format!("era5_{}.nc", job.parameters.get("year").unwrap());
        let jobs = materialize(
            &template(),
            &expand(&axes()),
            Path::new("/data"),
            &Naming::Custom(&name),
        )
        .unwrap();

        assert_eq!(jobs[1].output_path, PathBuf::from("/data/era5_2000.nc"));
    }

    #[test]
    fn should_use_grb_for_any_other_format() {
        let mut template = template();
        template.insert("format", "zarr");

        let jobs =
            materialize(&template, &expand(&axes()), Path::new("/d"), &Naming::Default).unwrap();
        assert_eq!(jobs[0].output_path, PathBuf::from("/d/[ID0]u-1999.grb"));
    }

    #[test]
    fn should_read_data_format_when_format_is_absent() {
        let mut template = template();
        template.remove("format");
        template.insert("data_format", "netcdf");

        let jobs =
            materialize(&template, &expand(&axes()), Path::new("/d"), &Naming::Default).unwrap();
        assert_eq!(jobs[1].output_path, PathBuf::from("/d/[ID1]u-2000.nc"));

        template.insert("data_format", vec!["netcdf"]);
        let jobs =
            materialize(&template, &expand(&axes()), Path::new("/d"), &Naming::Default).unwrap();
        assert_eq!(jobs[1].output_path, PathBuf::from("/d/[ID1]u-2000.nc"));
    }

    #[test]
    fn should_require_a_format_for_default_naming() {
        let mut template = template();
        template.remove("format");

        let result = materialize(&template, &expand(&axes()), Path::new("/d"), &Naming::Default);
        assert!(matches!(result, Err(JobError::MissingField(f)) if f == "format"));
    }

    #[test]
    fn should_reject_jobs_sharing_an_output_path() {
        let name = |job: &Job| format!("era5_{}.nc", job.parameters.get("variable").unwrap());

        let result = materialize(
            &template(),
            &expand(&axes()),
            Path::new("/data"),
            &Naming::Custom(&name),
        );
        assert_eq!(
            result,
            Err(JobError::DuplicateOutputPath {
                first: "0".to_string(),
                second: "1".to_string(),
                path: "/data/era5_u.nc".to_string(),
            })
        );
    }

    #[test]
    fn should_require_name_templates_to_tell_jobs_apart() {
        let pattern = NameTemplate::parse("era5_{variable}.nc").unwrap();
        assert!(matches!(
            pattern.validate(&template(), &axes()),
            Err(JobError::IncompleteNameTemplate { field, .. }) if field == "year"
        ));

        let pattern = NameTemplate::parse("era5_{id}.nc").unwrap();
        assert!(pattern.validate(&template(), &axes()).is_ok());
    }

    #[test]
    fn should_require_data_target() {
        let mut template = template();
        template.remove("data_target");

        let result = materialize(&template, &expand(&axes()), Path::new("/d"), &Naming::Default);
        assert!(matches!(result, Err(JobError::MissingField(f)) if f == "data_target"));
    }

    #[test]
    fn should_serialize_with_target_and_path() {
        let jobs =
            materialize(&template(), &expand(&axes()), Path::new("/data"), &Naming::Default)
                .unwrap();
        let json: serde_json::Value = serde_json::to_value(&jobs[0]).unwrap();

        assert_eq!(json["data_target"], "reanalysis-era5-pressure-levels");
        assert_eq!(json["output_path"], "/data/[ID0]u-1999.nc");
        assert_eq!(json["year"], 1999);
    }

    #[test]
    fn should_render_name_template() {
        let pattern = NameTemplate::parse("era5_{variable}_{year}_{id}{{x}}.nc").unwrap();
        pattern.validate(&template(), &axes()).unwrap();

        let render = |job: &Job| pattern.render(job);
        let jobs = materialize(
            &template(),
            &expand(&axes()),
            Path::new("/data"),
            &Naming::Custom(&render),
        )
        .unwrap();

        assert_eq!(jobs[0].output_path, PathBuf::from("/data/era5_u_1999_0{x}.nc"));
    }

    #[test]
    fn should_reject_bad_name_templates() {
        assert!(NameTemplate::parse("era5_{variable.nc").is_err());
        assert!(NameTemplate::parse("era5_{}.nc").is_err());
        assert!(NameTemplate::parse("era5_}.nc").is_err());

        let pattern = NameTemplate::parse("{month}.nc").unwrap();
        let mut template = template();
        template.remove("month");
        assert!(matches!(
            pattern.validate(&template, &axes()),
            Err(JobError::UnknownField(f)) if f == "month"
        ));
    }
}
