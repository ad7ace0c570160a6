use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use stripnode_core::{ColorOrder, JsonLinesStrip, NullStrip, StripDriver};

use crate::serial::{AdalightStrip, DEFAULT_BAUD};

/// Where rendered frames go: `null`, `jsonl:PATH` (`-` for stdout) or
/// `serial:PORT[@BAUD]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputSpec {
    Null,
    JsonLines(PathBuf),
    Serial { port: String, baud: u32 },
}

impl OutputSpec {
    pub fn writes_stdout(&self) -> bool {
        matches!(self, OutputSpec::JsonLines(path) if path.as_os_str() == "-")
    }

    pub fn open(&self, color_order: ColorOrder) -> Result<Box<dyn StripDriver>> {
        match self {
            OutputSpec::Null => Ok(Box::new(NullStrip::new())),
            OutputSpec::JsonLines(path) => {
                let writer: Box<dyn Write> = if self.writes_stdout() {
                    Box::new(io::stdout())
                } else {
                    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                        fs::create_dir_all(parent).with_context(|| {
                            format!("failed to create output directory: {}", parent.display())
                        })?;
                    }
                    let file = File::create(path).with_context(|| {
                        format!("failed to create frame log: {}", path.display())
                    })?;
                    Box::new(BufWriter::new(file))
                };
                Ok(Box::new(JsonLinesStrip::new(writer, color_order)))
            }
            OutputSpec::Serial { port, baud } => {
                Ok(Box::new(AdalightStrip::open(port, *baud, color_order)?))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSpecError(String);

impl fmt::Display for OutputSpecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (expected null, jsonl:PATH or serial:PORT[@BAUD])",
            self.0
        )
    }
}

impl std::error::Error for OutputSpecError {}

impl FromStr for OutputSpec {
    type Err = OutputSpecError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value == "null" {
            return Ok(OutputSpec::Null);
        }
        let Some((kind, target)) = value.split_once(':') else {
            return Err(OutputSpecError(format!("unknown output '{value}'")));
        };
        if target.is_empty() {
            return Err(OutputSpecError(format!("missing target in '{value}'")));
        }
        match kind {
            "jsonl" => Ok(OutputSpec::JsonLines(PathBuf::from(target))),
            "serial" => {
                let (port, baud) = match target.rsplit_once('@') {
                    Some((port, baud)) => {
                        let baud = baud
                            .parse::<u32>()
                            .map_err(|_| OutputSpecError(format!("invalid baud rate '{baud}'")))?;
                        (port, baud)
                    }
                    None => (target, DEFAULT_BAUD),
                };
                Ok(OutputSpec::Serial {
                    port: port.to_string(),
                    baud,
                })
            }
            _ => Err(OutputSpecError(format!("unknown output kind '{kind}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::OutputSpec;

    #[test]
    fn parses_each_kind() {
        assert_eq!("null".parse::<OutputSpec>().unwrap(), OutputSpec::Null);
        assert_eq!(
            "jsonl:frames.jsonl".parse::<OutputSpec>().unwrap(),
            OutputSpec::JsonLines(PathBuf::from("frames.jsonl"))
        );
        assert_eq!(
            "serial:/dev/ttyUSB0".parse::<OutputSpec>().unwrap(),
            OutputSpec::Serial {
                port: "/dev/ttyUSB0".to_string(),
                baud: 115_200
            }
        );
        assert_eq!(
            "serial:COM3@921600".parse::<OutputSpec>().unwrap(),
            OutputSpec::Serial {
                port: "COM3".to_string(),
                baud: 921_600
            }
        );
    }

    #[test]
    fn dash_means_stdout() {
        assert!("jsonl:-".parse::<OutputSpec>().unwrap().writes_stdout());
        assert!(!"jsonl:out.jsonl".parse::<OutputSpec>().unwrap().writes_stdout());
    }

    #[test]
    fn rejects_unknown_and_empty() {
        assert!("ws2812".parse::<OutputSpec>().is_err());
        assert!("jsonl:".parse::<OutputSpec>().is_err());
        assert!("serial:COM3@fast".parse::<OutputSpec>().is_err());
        assert!("udp:1.2.3.4".parse::<OutputSpec>().is_err());
    }
}
