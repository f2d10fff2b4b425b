use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use thiserror::Error;

use crate::data::model::CropRegion;

// ---------------------------------------------------------------------------
// Configuration document
// ---------------------------------------------------------------------------

/// The YAML run configuration. Every key is required.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Config {
    pub paths: Paths,
    pub parameters: Parameters,
    pub crop_params: CropRegion,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Paths {
    pub header_file: PathBuf,
    pub dark_reference: PathBuf,
    pub white_reference: PathBuf,
    pub output_dir: PathBuf,
    pub spectral_binned_file: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Parameters {
    pub reflectance_factor: FactorExpr,
    pub spatial_bin_size: usize,
    pub spectral_bin_size: usize,
    pub target_wavelengths: [f64; 3],
}

/// `reflectance_factor` as written: a plain number or an arithmetic string
/// such as `"1/100"`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FactorExpr {
    Number(f64),
    Text(String),
}

impl FactorExpr {
    pub fn value(&self) -> std::result::Result<f64, ExpressionError> {
        let value = match self {
            FactorExpr::Number(v) => *v,
            FactorExpr::Text(s) => evaluate(s)?,
        };
        if !value.is_finite() {
            return Err(ExpressionError::NonFinite(value));
        }
        Ok(value)
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let mut config: Config = serde_yml::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.resolve_paths(path.parent().unwrap_or_else(|| Path::new("")));
        Ok(config)
    }

    pub fn reflectance_factor(&self) -> Result<f64> {
        self.parameters
            .reflectance_factor
            .value()
            .context("evaluating parameters.reflectance_factor")
    }

    /// Relative paths are taken relative to the directory of the config file.
    fn resolve_paths(&mut self, base: &Path) {
        let p = &mut self.paths;
        for path in [
            &mut p.header_file,
            &mut p.dark_reference,
            &mut p.white_reference,
            &mut p.output_dir,
            &mut p.spectral_binned_file,
        ] {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Restricted arithmetic
// ---------------------------------------------------------------------------

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExpressionError {
    #[error("Unexpected character '{ch}' at position {pos}")]
    UnexpectedChar { ch: char, pos: usize },

    #[error("Unexpected end of expression")]
    UnexpectedEnd,

    #[error("Invalid number '{0}'")]
    InvalidNumber(String),

    #[error("Expression evaluates to a non-finite value: {0}")]
    NonFinite(f64),
}

/// Evaluate a numeric expression made only of literals, `+ - * /`, unary
/// signs and parentheses.
///
/// ```text
/// expr   := term (('+' | '-') term)*
/// term   := factor (('*' | '/') factor)*
/// factor := ('+' | '-') factor | '(' expr ')' | number
/// ```
pub fn evaluate(input: &str) -> std::result::Result<f64, ExpressionError> {
    let mut parser = Parser {
        chars: input.char_indices().collect(),
        pos: 0,
    };
    let value = parser.expr()?;
    parser.skip_ws();
    if let Some(&(pos, ch)) = parser.chars.get(parser.pos) {
        return Err(ExpressionError::UnexpectedChar { ch, pos });
    }
    Ok(value)
}

struct Parser {
    chars: Vec<(usize, char)>,
    pos: usize,
}

impl Parser {
    fn skip_ws(&mut self) {
        while matches!(self.chars.get(self.pos), Some((_, c)) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.skip_ws();
        self.chars.get(self.pos).map(|&(_, c)| c)
    }

    fn expr(&mut self) -> std::result::Result<f64, ExpressionError> {
        let mut value = self.term()?;
        while let Some(op @ ('+' | '-')) = self.peek() {
            self.pos += 1;
            let rhs = self.term()?;
            value = if op == '+' { value + rhs } else { value - rhs };
        }
        Ok(value)
    }

    fn term(&mut self) -> std::result::Result<f64, ExpressionError> {
        let mut value = self.factor()?;
        while let Some(op @ ('*' | '/')) = self.peek() {
            self.pos += 1;
            let rhs = self.factor()?;
            value = if op == '*' { value * rhs } else { value / rhs };
        }
        Ok(value)
    }

    fn factor(&mut self) -> std::result::Result<f64, ExpressionError> {
        match self.peek() {
            None => Err(ExpressionError::UnexpectedEnd),
            Some('+') => {
                self.pos += 1;
                self.factor()
            }
            Some('-') => {
                self.pos += 1;
                Ok(-self.factor()?)
            }
            Some('(') => {
                self.pos += 1;
                let value = self.expr()?;
                match self.peek() {
                    Some(')') => {
                        self.pos += 1;
                        Ok(value)
                    }
                    Some(ch) => Err(ExpressionError::UnexpectedChar {
                        ch,
                        pos: self.chars[self.pos].0,
                    }),
                    None => Err(ExpressionError::UnexpectedEnd),
                }
            }
            Some(c) if c.is_ascii_digit() || c == '.' => self.number(),
            Some(ch) => Err(ExpressionError::UnexpectedChar {
                ch,
                pos: self.chars[self.pos].0,
            }),
        }
    }

    fn number(&mut self) -> std::result::Result<f64, ExpressionError> {
        let mut text = String::new();
        while let Some(&(_, c)) = self.chars.get(self.pos) {
            let exponent_sign = (c == '+' || c == '-')
                && matches!(text.chars().last(), Some('e' | 'E'));
            if c.is_ascii_digit() || c == '.' || c == 'e' || c == 'E' || exponent_sign {
                text.push(c);
                self.pos += 1;
            } else {
                break;
            }
        }
        text.parse::<f64>()
            .map_err(|_| ExpressionError::InvalidNumber(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const CONFIG: &str = r#"
paths:
  header_file: data/sample.hdr
  dark_reference: data/dark.hdr
  white_reference: /abs/white.hdr
  output_dir: out
  spectral_binned_file: out/spectral_binned_image.hdr
parameters:
  reflectance_factor: "1/100"
  spatial_bin_size: 2
  spectral_bin_size: 4
  target_wavelengths: [1200.0, 1600, 2100.0]
crop_params:
  x1: 10
  y1: 20
  x2: 110
  y2: 220
"#;

    #[test]
    fn test_evaluate_arithmetic() {
        assert_abs_diff_eq!(evaluate("1/100").unwrap(), 0.01);
        assert_abs_diff_eq!(evaluate(" (2 + 3) * 4 ").unwrap(), 20.0);
        assert_abs_diff_eq!(evaluate("-2 * -3 - 1").unwrap(), 5.0);
        assert_abs_diff_eq!(evaluate("1e2 / 2.5e-1").unwrap(), 400.0);
        assert_abs_diff_eq!(evaluate("10 - 4 - 3").unwrap(), 3.0);
        assert_abs_diff_eq!(evaluate(".5").unwrap(), 0.5);
    }

    #[test]
    fn test_evaluate_rejects_code() {
        assert!(matches!(
            evaluate("__import__('os')"),
            Err(ExpressionError::UnexpectedChar { ch: '_', pos: 0 })
        ));
        assert!(matches!(evaluate("1 +"), Err(ExpressionError::UnexpectedEnd)));
        assert!(matches!(evaluate("(1"), Err(ExpressionError::UnexpectedEnd)));
        assert!(matches!(evaluate("2 3"), Err(ExpressionError::UnexpectedChar { ch: '3', .. })));
        assert!(matches!(evaluate("1.2.3"), Err(ExpressionError::InvalidNumber(_))));
    }

    #[test]
    fn test_factor_must_be_finite() {
        let expr = FactorExpr::Text("1/0".into());
        assert!(matches!(expr.value(), Err(ExpressionError::NonFinite(_))));
        assert_eq!(FactorExpr::Number(0.5).value(), Ok(0.5));
    }

    #[test]
    fn test_load_resolves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, CONFIG).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.paths.header_file, dir.path().join("data/sample.hdr"));
        assert_eq!(config.paths.white_reference, PathBuf::from("/abs/white.hdr"));
        assert_eq!(config.parameters.target_wavelengths, [1200.0, 1600.0, 2100.0]);
        assert_eq!(config.crop_params, CropRegion { x1: 10, y1: 20, x2: 110, y2: 220 });
        assert_abs_diff_eq!(config.reflectance_factor().unwrap(), 0.01);
    }

    #[test]
    fn test_missing_key_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, CONFIG.replace("  spatial_bin_size: 2\n", "")).unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(format!("{err:#}").contains("spatial_bin_size"));
    }

    #[test]
    fn test_numeric_factor_accepted() {
        let yaml = CONFIG.replace("\"1/100\"", "0.25");
        let config: Config = serde_yml::from_str(&yaml).unwrap();
        assert_eq!(config.parameters.reflectance_factor, FactorExpr::Number(0.25));
    }
}
