//! Line commands read from stdin

use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Primary metric selector
    Primary(String),
    /// Secondary metric selector
    Secondary(String),
    Pair(String, String),
    /// Lon/lat rectangle on the primary map
    BrushMap([f64; 4]),
    /// Pixel rectangle on the scatter plot
    BrushScatter([f64; 4]),
    Clear,
    Status,
    Metrics,
    Quit,
}

#[derive(Error, Debug, PartialEq)]
pub enum CommandError {
    #[error("unknown command '{0}'")]
    Unknown(String),

    #[error("'{command}' expects {expected} argument(s), got {found}")]
    Arity {
        command: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("'{0}' is not a number")]
    NotANumber(String),
}

impl Command {
    /// Parse one line. Blank lines and `#` comments yield `None`.
    pub fn parse(line: &str) -> Result<Option<Command>, CommandError> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }

        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Ok(None);
        };
        let args: Vec<&str> = words.collect();

        let command = match head.to_ascii_lowercase().as_str() {
            "primary" => {
                let [metric] = exact::<1>("primary", &args)?;
                Command::Primary(metric.to_string())
            }
            "secondary" => {
                let [metric] = exact::<1>("secondary", &args)?;
                Command::Secondary(metric.to_string())
            }
            "pair" => {
                let [primary, secondary] = exact::<2>("pair", &args)?;
                Command::Pair(primary.to_string(), secondary.to_string())
            }
            "brush-map" => Command::BrushMap(numbers("brush-map", &args)?),
            "brush-scatter" => Command::BrushScatter(numbers("brush-scatter", &args)?),
            "clear" => {
                exact::<0>("clear", &args)?;
                Command::Clear
            }
            "status" => Command::Status,
            "metrics" => Command::Metrics,
            "quit" | "exit" => Command::Quit,
            other => return Err(CommandError::Unknown(other.to_string())),
        };

        Ok(Some(command))
    }
}

fn exact<'a, const N: usize>(command: &'static str, args: &[&'a str]) -> Result<[&'a str; N], CommandError> {
    <[&str; N]>::try_from(args).map_err(|_| CommandError::Arity {
        command,
        expected: N,
        found: args.len(),
    })
}

fn numbers(command: &'static str, args: &[&str]) -> Result<[f64; 4], CommandError> {
    let words = exact::<4>(command, args)?;
    let mut out = [0.0; 4];
    for (slot, word) in out.iter_mut().zip(words) {
        *slot = word
            .parse::<f64>()
            .map_err(|_| CommandError::NotANumber(word.to_string()))?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_selectors() {
        assert_eq!(
            Command::parse("primary median_household_income"),
            Ok(Some(Command::Primary("median_household_income".to_string())))
        );
        assert_eq!(
            Command::parse("  PAIR poverty_perc percent_stroke "),
            Ok(Some(Command::Pair("poverty_perc".to_string(), "percent_stroke".to_string())))
        );
    }

    #[test]
    fn test_brush_arguments() {
        assert_eq!(
            Command::parse("brush-map -90 30 -85.5 35"),
            Ok(Some(Command::BrushMap([-90.0, 30.0, -85.5, 35.0])))
        );
        assert_eq!(
            Command::parse("brush-scatter 0 0 100"),
            Err(CommandError::Arity {
                command: "brush-scatter",
                expected: 4,
                found: 3
            })
        );
        assert_eq!(
            Command::parse("brush-scatter 0 0 100 abc"),
            Err(CommandError::NotANumber("abc".to_string()))
        );
    }

    #[test]
    fn test_blank_and_comment_lines() {
        assert_eq!(Command::parse(""), Ok(None));
        assert_eq!(Command::parse("   # a note"), Ok(None));
    }

    #[test]
    fn test_unknown_and_arity() {
        assert_eq!(Command::parse("zoom 3"), Err(CommandError::Unknown("zoom".to_string())));
        assert!(matches!(Command::parse("primary"), Err(CommandError::Arity { .. })));
        assert!(matches!(Command::parse("clear now"), Err(CommandError::Arity { .. })));
        assert_eq!(Command::parse("quit"), Ok(Some(Command::Quit)));
    }
}
