//! Command-line argument parsing for carrierline

/// Parse command line arguments
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Args {
    pub validate: bool,
    pub help: bool,
    pub resolve: Option<String>,
    pub simulate: Option<String>,
}

pub fn parse_args() -> Args {
    let args: Vec<String> = std::env::args().collect();
    parse_args_from(&args)
}

/// Parse from an explicit argv; the first element is the program name.
pub fn parse_args_from(args: &[String]) -> Args {
    let mut result = Args::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--validate" => result.validate = true,
            "--help" | "-h" => result.help = true,
            "--resolve" => {
                if i + 1 < args.len() {
                    i += 1;
                    result.resolve = Some(args[i].clone());
                } else {
                    // A bare flag has nothing to run
                    result.help = true;
                }
            }
            "--simulate" => {
                if i + 1 < args.len() {
                    i += 1;
                    result.simulate = Some(args[i].clone());
                } else {
                    result.help = true;
                }
            }
            _ => {}
        }
        i += 1;
    }

    result
}

pub fn print_help() {
    println!("carrierline - carrier display name and IMS SMS retry engine\n");
    println!("USAGE:");
    println!("    carrierline [OPTIONS]\n");
    println!("OPTIONS:");
    println!("    --validate              Validate configuration and exit");
    println!("    --resolve FILE          Resolve display name data from a JSON scenario");
    println!("    --simulate FILE         Run a JSON SMS scenario and print counters");
    println!("    --help, -h              Show this help message\n");
    println!("ENVIRONMENT:");
    println!("    SMS_MAX_IMS_RETRIES, SMS_QUEUE_DEPTH, CDNR_NO_SERVICE_TEXT,");
    println!("    CDNR_EMERGENCY_ONLY_TEXT, CDNR_WFC_VOICE_FORMAT, CDNR_WFC_DATA_FORMAT,");
    println!("    CDNR_WFC_FLIGHT_MODE_FORMAT");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(items: &[&str]) -> Vec<String> {
        std::iter::once("carrierline")
            .chain(items.iter().copied())
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_parse_args_default() {
        assert_eq!(parse_args_from(&argv(&[])), Args::default());
    }

    #[test]
    fn test_parse_args_validate() {
        let result = parse_args_from(&argv(&["--validate"]));
        assert!(result.validate);
        assert!(!result.help);
    }

    #[test]
    fn test_parse_args_help() {
        assert!(parse_args_from(&argv(&["--help"])).help);
        assert!(parse_args_from(&argv(&["-h"])).help);
    }

    #[test]
    fn test_parse_args_resolve() {
        let result = parse_args_from(&argv(&["--resolve", "cdnr.json"]));
        assert_eq!(result.resolve.as_deref(), Some("cdnr.json"));
        assert!(result.simulate.is_none());
    }

    #[test]
    fn test_parse_args_simulate() {
        let result = parse_args_from(&argv(&["--simulate", "sms.json"]));
        assert_eq!(result.simulate.as_deref(), Some("sms.json"));
    }

    #[test]
    fn test_parse_args_missing_file_shows_help() {
        assert!(parse_args_from(&argv(&["--resolve"])).help);
        assert!(parse_args_from(&argv(&["--simulate"])).help);
    }

    #[test]
    fn test_parse_args_multiple_flags() {
        let result = parse_args_from(&argv(&["--validate", "--resolve", "a.json", "--unknown"]));
        assert!(result.validate);
        assert_eq!(result.resolve.as_deref(), Some("a.json"));
    }
}
