//! Model serialization and persistence
//!
//! The canonical format is a line-oriented text layout:
//!
//! ```text
//! solver_type L2R_LR
//! nr_class 2
//! label 1 -1
//! nr_feature 3
//! bias -1
//! w
//! 0.25
//! -1.5
//! 0.0125
//! ```
//!
//! One weight row per feature (bias row last when enabled), each weight
//! printed with six significant digits and followed by a space. A JSON
//! export is also available for tooling.

use crate::core::{LinearError, Result, SolverType};
use crate::model::{weight_columns, Model};
use crate::utils::{format_g, parse_int, parse_real};
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

fn format_error(line: usize, message: impl Into<String>) -> LinearError {
    LinearError::ModelFormat {
        line,
        message: message.into(),
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "solver_type {}", self.solver_type())?;
        writeln!(f, "nr_class {}", self.nr_class())?;
        write!(f, "label")?;
        for label in self.labels() {
            write!(f, " {label}")?;
        }
        writeln!(f)?;
        writeln!(f, "nr_feature {}", self.nr_feature())?;
        writeln!(f, "bias {}", self.bias())?;
        writeln!(f, "w")?;

        let nr_w = self.nr_weight_columns();
        for row in self.feature_weights().chunks(nr_w) {
            for &value in row {
                write!(f, "{} ", format_g(value, 6))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl Model {
    /// Save the model in the text format
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_to(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Write the model in the text format
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        write!(writer, "{self}")?;
        Ok(())
    }

    /// Text rendering of the model
    pub fn to_text(&self) -> String {
        self.to_string()
    }

    /// Load a model saved in the text format
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::read_from(BufReader::new(File::open(path)?))
    }

    /// Parse a model in the text format
    ///
    /// Header lines may come in any order before the `w` marker. Every
    /// numeric token must parse completely, and the weight block must hold
    /// exactly one value per stored weight.
    pub fn read_from<R: BufRead>(reader: R) -> Result<Self> {
        let mut solver_type: Option<SolverType> = None;
        let mut nr_class: Option<usize> = None;
        let mut labels: Option<Vec<i32>> = None;
        let mut nr_feature: Option<usize> = None;
        let mut bias: Option<f64> = None;

        let mut lines = reader.lines().enumerate();
        let mut header_done = false;

        for (line_num, line) in lines.by_ref() {
            let line_num = line_num + 1;
            let line = line?;
            let mut tokens = line.split_whitespace();
            let Some(keyword) = tokens.next() else {
                continue;
            };
            let args: Vec<&str> = tokens.collect();

            let single = |args: &[&str]| -> Result<String> {
                match args {
                    [value] => Ok((*value).to_string()),
                    _ => Err(format_error(
                        line_num,
                        format!("'{keyword}' expects exactly one value"),
                    )),
                }
            };

            match keyword {
                "solver_type" => {
                    solver_type = Some(single(&args)?.parse()?);
                }
                "nr_class" => {
                    let value = parse_int(&single(&args)?)?;
                    if value < 1 {
                        return Err(format_error(line_num, "nr_class must be positive"));
                    }
                    nr_class = Some(value as usize);
                }
                "label" => {
                    let parsed = args
                        .iter()
                        .map(|token| parse_int(token))
                        .collect::<Result<Vec<i32>>>()?;
                    labels = Some(parsed);
                }
                "nr_feature" => {
                    let value = parse_int(&single(&args)?)?;
                    if value < 0 {
                        return Err(format_error(line_num, "nr_feature must not be negative"));
                    }
                    nr_feature = Some(value as usize);
                }
                "bias" => {
                    bias = Some(parse_real(&single(&args)?)?);
                }
                "w" => {
                    if !args.is_empty() {
                        return Err(format_error(line_num, "unexpected tokens after 'w'"));
                    }
                    header_done = true;
                    break;
                }
                other => {
                    return Err(format_error(line_num, format!("unknown keyword '{other}'")));
                }
            }
        }

        if !header_done {
            return Err(format_error(0, "missing 'w' marker"));
        }
        let solver_type = solver_type.ok_or_else(|| format_error(0, "missing solver_type"))?;
        let nr_class = nr_class.ok_or_else(|| format_error(0, "missing nr_class"))?;
        let nr_feature = nr_feature.ok_or_else(|| format_error(0, "missing nr_feature"))?;
        let bias = bias.ok_or_else(|| format_error(0, "missing bias"))?;
        let labels = labels.ok_or_else(|| format_error(0, "missing label"))?;
        if labels.len() != nr_class {
            return Err(format_error(
                0,
                format!(
                    "nr_class is {nr_class} but {} labels are listed",
                    labels.len()
                ),
            ));
        }

        let rows = nr_feature + usize::from(bias >= 0.0);
        let expected = rows * weight_columns(solver_type, nr_class);
        let mut w = Vec::with_capacity(expected);
        for (line_num, line) in lines {
            let line = line?;
            for token in line.split_whitespace() {
                if w.len() == expected {
                    return Err(format_error(
                        line_num + 1,
                        format!("more than {expected} weights"),
                    ));
                }
                w.push(parse_real(token).map_err(|e| format_error(line_num + 1, e.to_string()))?);
            }
        }
        if w.len() != expected {
            return Err(format_error(
                0,
                format!("expected {expected} weights, found {}", w.len()),
            ));
        }

        Model::from_parts(solver_type, labels, nr_feature, bias, w)
    }

    /// Save the model as JSON
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self)
            .map_err(|e| LinearError::SerializationError(e.to_string()))?;
        writer.flush()?;
        Ok(())
    }

    /// Load a JSON model, re-checking its consistency
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let raw: Model = serde_json::from_reader(reader)
            .map_err(|e| LinearError::SerializationError(e.to_string()))?;
        Model::from_parts(
            raw.solver_type(),
            raw.labels().to_vec(),
            raw.nr_feature(),
            raw.bias(),
            raw.feature_weights().to_vec(),
        )
    }
}
