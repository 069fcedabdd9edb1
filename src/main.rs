//! CLI for carbonara: check DA loader images for the carbonara vulnerability.

#![cfg(feature = "cli")]

use carbonara::{scan, ScanReport, Verdict};
use clap::Parser;
use indexmap::IndexMap;
use sha2::{Digest, Sha256};
use std::path::Path;
use walkdir::WalkDir;

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

#[derive(Parser)]
#[command(name = "carbonara")]
#[command(about = "Check MediaTek DA loader images for the carbonara vulnerability", long_about = None)]
struct Args {
    /// Path to a DA loader image or directory to scan (use -d/--directory to scan a whole directory)
    path: Option<String>,

    /// Scan a whole directory (optionally with -r to recurse into subdirectories)
    #[arg(short = 'd', long = "directory", value_name = "DIR")]
    directory: Option<String>,

    /// When scanning a directory, recurse into subdirectories
    #[arg(short, long)]
    recursive: bool,

    /// File extensions to scan (comma-separated). No-extension files are always scanned. Use --all to ignore the filter.
    #[arg(short, long, default_value = "bin,img")]
    extensions: String,

    /// Scan all files regardless of extension
    #[arg(long)]
    all: bool,

    /// Output JSON per result (one line per file unless --pretty)
    #[arg(long)]
    json: bool,

    /// Pretty-print JSON (use with --json)
    #[arg(long)]
    pretty: bool,

    /// Quiet: only print vulnerable paths
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let exts: std::collections::HashSet<String> = args
        .extensions
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .collect();

    let path_str = args
        .directory
        .as_ref()
        .or(args.path.as_ref())
        .ok_or("Missing path: give a file/directory as argument or use -d/--directory <DIR>")?;
    let path = Path::new(path_str.as_str());

    if !path.exists() {
        eprintln!("Not found: {}", path.display());
        std::process::exit(1);
    }

    if path.is_file() {
        if args.directory.is_some() {
            eprintln!("--directory expects a directory, not a file: {}", path.display());
            std::process::exit(1);
        }
        scan_one(path, &args)?;
        return Ok(());
    }

    if path.is_dir() {
        if !args.quiet {
            eprintln!(
                "Scanning directory: {} {}",
                path.display(),
                if args.recursive { "(recursive)" } else { "" }
            );
        }
        scan_dir(path, &args, &exts)?;
        return Ok(());
    }

    eprintln!("Not a file or directory: {}", path.display());
    std::process::exit(1);
}

fn scan_one(path: &Path, args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = std::fs::read(path)?;
    let report = scan(&bytes)?;
    print_result(path.display().to_string(), &report, args, &bytes)?;
    Ok(())
}

fn scan_dir(
    dir: &Path,
    args: &Args,
    exts: &std::collections::HashSet<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let walker = if args.recursive {
        WalkDir::new(dir).into_iter()
    } else {
        WalkDir::new(dir).max_depth(1).into_iter()
    };

    let mut total = 0u64;
    let mut vulnerable = 0u64;
    let mut errors = 0u64;

    for entry in walker {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        if !args.all && !ext.is_empty() && !exts.is_empty() && !exts.contains(&ext) {
            continue;
        }
        total += 1;
        let bytes = match std::fs::read(path) {
            Ok(b) => b,
            Err(e) => {
                eprintln!("ERROR {}: {}", path.display(), e);
                errors += 1;
                continue;
            }
        };
        let report = match scan(&bytes) {
            Ok(r) => r,
            Err(e) => {
                // A decode failure is never a "not vulnerable" verdict.
                eprintln!("ERROR {}: {}", path.display(), e);
                errors += 1;
                continue;
            }
        };
        if report.is_vulnerable() {
            vulnerable += 1;
        }
        print_result(path.display().to_string(), &report, args, &bytes)?;
    }

    if !args.quiet {
        eprintln!(
            "Scanned {} files, {} vulnerable, {} errors",
            total, vulnerable, errors
        );
    }
    Ok(())
}

fn verdict_line(report: &ScanReport) -> &'static str {
    match report.first_verdict() {
        Some(Verdict::Vulnerable) => "VULNERABLE",
        Some(Verdict::Patched) => "PATCHED",
        Some(Verdict::NoStage1) => "NOT VULNERABLE (no stage-1 payload)",
        None => "NO DA ENTRIES",
    }
}

fn print_result(
    path: String,
    report: &ScanReport,
    args: &Args,
    bytes: &[u8],
) -> Result<(), Box<dyn std::error::Error>> {
    if args.quiet && !report.is_vulnerable() {
        return Ok(());
    }
    let sha256 = sha256_hex(bytes);

    if args.json {
        let mut out = IndexMap::<String, serde_json::Value>::new();
        out.insert("sha256".to_string(), serde_json::Value::String(sha256));
        out.insert("path".to_string(), serde_json::Value::String(path.clone()));
        out.insert(
            "vulnerable".to_string(),
            serde_json::Value::Bool(report.is_vulnerable()),
        );
        out.insert("verdict".to_string(), serde_json::to_value(report.first_verdict())?);
        out.insert("format".to_string(), serde_json::to_value(report.format)?);
        out.insert("entry_count".to_string(), serde_json::to_value(report.entry_count)?);
        out.insert("entries".to_string(), serde_json::to_value(&report.entries)?);
        out.insert("warnings".to_string(), serde_json::to_value(&report.warnings)?);
        out.insert("size_bytes".to_string(), serde_json::to_value(report.size_bytes)?);
        let json_str = if args.pretty {
            serde_json::to_string_pretty(&out)?
        } else {
            serde_json::to_string(&out)?
        };
        println!("{}", json_str);
        return Ok(());
    }

    println!("{} {} ({} bytes)", verdict_line(report), path, report.size_bytes);
    println!("  sha256: {}", sha256);
    if !args.quiet {
        println!(
            "  format: {}, {} DA entries",
            report.format.label(),
            report.entry_count
        );
        for e in &report.entries {
            let stage1 = match (e.stage1_offset, e.stage1_length) {
                (Some(off), Some(len)) => format!("stage-1 {:#x}+{:#x}", off, len),
                _ => "no stage-1".to_string(),
            };
            println!(
                "  entry {}: hw 0x{:04X}, sw 0x{:04X}, {} region(s), {} - {}",
                e.index, e.hw_code, e.sw_version, e.region_count, stage1,
                e.verdict.label()
            );
        }
    }
    for w in &report.warnings {
        println!("  warning: {}", w);
    }
    Ok(())
}
