use selkie::{
    AutoFixer, ExportConfig, ExportPipeline, Rasterizer, ResvgRasterizer, VectorOutput,
};
use std::io::Read;

#[derive(Debug)]
enum CliError {
    Usage(&'static str),
    Io(std::io::Error),
    Export(selkie::ExportError),
    NoViewBox,
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Usage(msg) => write!(f, "{msg}"),
            CliError::Io(err) => write!(f, "I/O error: {err}"),
            CliError::Export(err) => write!(f, "{err}"),
            CliError::NoViewBox => {
                write!(f, "SVG has no usable viewBox/width/height to size the output")
            }
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<selkie::ExportError> for CliError {
    fn from(value: selkie::ExportError) -> Self {
        Self::Export(value)
    }
}

#[derive(Debug, Clone, Copy, Default)]
enum Command {
    #[default]
    Fix,
    Rasterize,
}

#[derive(Debug, Default)]
struct Args {
    command: Command,
    input: Option<String>,
    out: Option<String>,
    scale: f32,
    transparent: bool,
    check: bool,
}

fn usage() -> &'static str {
    "selkie-cli\n\
\n\
USAGE:\n\
  selkie-cli fix [--check] [--out <path>] [<path>|-]\n\
  selkie-cli rasterize [--scale <n>] [--transparent] [--out <path>] [<path>|-]\n\
\n\
NOTES:\n\
  - If <path> is omitted or '-', input is read from stdin.\n\
  - fix prints the repaired source to stdout; --check exits 1 when a repair\n\
    would change the input and prints nothing.\n\
  - rasterize reads SVG, writes PNG (default ./out.png); output pixel size is\n\
    round(intrinsic size x scale).\n\
"
}

fn parse_args(argv: &[String]) -> Result<Args, CliError> {
    let mut args = Args {
        scale: 1.0,
        ..Default::default()
    };

    let mut it = argv.iter().skip(1).peekable();
    while let Some(a) = it.next() {
        match a.as_str() {
            "--help" | "-h" => return Err(CliError::Usage(usage())),
            "fix" => args.command = Command::Fix,
            "rasterize" => args.command = Command::Rasterize,
            "--check" => args.check = true,
            "--transparent" => args.transparent = true,
            "--scale" => {
                let Some(scale) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.scale = scale.parse::<f32>().map_err(|_| CliError::Usage(usage()))?;
                if !(args.scale.is_finite() && args.scale > 0.0) {
                    return Err(CliError::Usage(usage()));
                }
            }
            "--out" => {
                let Some(out) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.out = Some(out.clone());
            }
            other if other.starts_with('-') && other != "-" => {
                return Err(CliError::Usage(usage()));
            }
            path => {
                if args.input.is_some() {
                    return Err(CliError::Usage(usage()));
                }
                args.input = Some(path.to_string());
            }
        }
    }

    Ok(args)
}

fn read_input(input: Option<&str>) -> Result<String, CliError> {
    match input {
        None | Some("-") => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
        Some(path) => Ok(std::fs::read_to_string(path)?),
    }
}

/// Cheap, non-validating parse of the root `viewBox="minX minY w h"`, falling back to
/// `width`/`height` attributes.
fn intrinsic_size(svg: &str) -> Option<(f32, f32)> {
    if let Some(i) = svg.find("viewBox=\"") {
        let rest = &svg[i + "viewBox=\"".len()..];
        let raw = &rest[..rest.find('"')?];
        let mut it = raw.split_whitespace();
        let _min_x = it.next()?.parse::<f32>().ok()?;
        let _min_y = it.next()?.parse::<f32>().ok()?;
        let w = it.next()?.parse::<f32>().ok()?;
        let h = it.next()?.parse::<f32>().ok()?;
        if w.is_finite() && h.is_finite() && w > 0.0 && h > 0.0 {
            return Some((w, h));
        }
    }

    let attr = |name: &str| -> Option<f32> {
        let i = svg.find(&format!("{name}=\""))?;
        let rest = &svg[i + name.len() + 2..];
        rest[..rest.find('"')?].trim().parse::<f32>().ok()
    };
    match (attr("width"), attr("height")) {
        (Some(w), Some(h)) if w > 0.0 && h > 0.0 => Some((w, h)),
        _ => None,
    }
}

fn run_fix(args: &Args) -> Result<i32, CliError> {
    let source = read_input(args.input.as_deref())?;
    let result = AutoFixer::new().fix(&source);

    if args.check {
        return Ok(if result.has_changes { 1 } else { 0 });
    }
    match &args.out {
        Some(path) => std::fs::write(path, &result.code)?,
        None => print!("{}", result.code),
    }
    Ok(0)
}

fn run_rasterize(args: &Args) -> Result<i32, CliError> {
    let svg = read_input(args.input.as_deref())?;
    let (width, height) = intrinsic_size(&svg).ok_or(CliError::NoViewBox)?;
    let output = VectorOutput { svg, width, height };

    let config = ExportConfig {
        scale: args.scale,
        transparent_background: args.transparent,
    };
    let mut pipeline = ExportPipeline::new();
    let rasterizer = ResvgRasterizer::new();

    let job = pipeline.begin(&output, &config)?;
    let result = rasterizer.rasterize(
        job.svg(),
        job.width_px(),
        job.height_px(),
        job.background(),
    );
    let artifact = pipeline.finish(job, result)?;

    let out = args.out.as_deref().unwrap_or("out.png");
    std::fs::write(out, &artifact.bytes)?;
    eprintln!("wrote {out} ({}x{})", artifact.width, artifact.height);
    Ok(0)
}

fn run(args: Args) -> Result<i32, CliError> {
    match args.command {
        Command::Fix => run_fix(&args),
        Command::Rasterize => run_rasterize(&args),
    }
}

fn main() {
    let args = match parse_args(&std::env::args().collect::<Vec<_>>()) {
        Ok(v) => v,
        Err(CliError::Usage(msg)) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    match run(args) {
        Ok(code) => std::process::exit(code),
        Err(CliError::Usage(msg)) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(parts: &[&str]) -> Result<Args, CliError> {
        let mut argv = vec!["selkie-cli".to_string()];
        argv.extend(parts.iter().map(|s| s.to_string()));
        parse_args(&argv)
    }

    #[test]
    fn parses_fix_with_check() {
        let a = args(&["fix", "--check", "diagram.mmd"]).unwrap();
        assert!(matches!(a.command, Command::Fix));
        assert!(a.check);
        assert_eq!(a.input.as_deref(), Some("diagram.mmd"));
    }

    #[test]
    fn parses_rasterize_options() {
        let a = args(&["rasterize", "--scale", "2.5", "--transparent", "--out", "x.png", "-"]).unwrap();
        assert!(matches!(a.command, Command::Rasterize));
        assert_eq!(a.scale, 2.5);
        assert!(a.transparent);
        assert_eq!(a.out.as_deref(), Some("x.png"));
        assert_eq!(a.input.as_deref(), Some("-"));
    }

    #[test]
    fn rejects_bad_scale_and_unknown_flags() {
        assert!(matches!(
            args(&["rasterize", "--scale", "0"]),
            Err(CliError::Usage(_))
        ));
        assert!(matches!(args(&["--nope"]), Err(CliError::Usage(_))));
    }

    #[test]
    fn intrinsic_size_prefers_viewbox() {
        let svg = r#"<svg width="10" height="20" viewBox="0 0 400 300"></svg>"#;
        assert_eq!(intrinsic_size(svg), Some((400.0, 300.0)));
        assert_eq!(intrinsic_size("<svg width=\"10\" height=\"20\">"), Some((10.0, 20.0)));
        assert_eq!(intrinsic_size("<svg>"), None);
    }
}
