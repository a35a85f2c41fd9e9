//! Fingerprint database for incremental builds.
//!
//! Tracks, per output path, the exact command that produced it and the set
//! of input files it read, so a rebuild can skip work whose inputs and
//! command are unchanged since the last successful run.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};

use crate::builder::toolchain::DepsMode;

/// Persisted record of a single compile/archive/link invocation.
pub struct FingerprintDb {
    conn: Connection,
}

impl FingerprintDb {
    /// Open (creating if necessary) the fingerprint database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("failed to open fingerprint db at {}", path.display()))?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS commands (
                output_path TEXT PRIMARY KEY,
                quoted_command TEXT NOT NULL,
                output TEXT NOT NULL,
                toolchain_hash TEXT NOT NULL,
                duration_ms INTEGER NOT NULL
            );
            CREATE TABLE IF NOT EXISTS inputs (
                command_output_path TEXT NOT NULL,
                input_path TEXT NOT NULL,
                prev_mtime INTEGER NOT NULL,
                UNIQUE(command_output_path, input_path)
            );",
        )?;

        Ok(FingerprintDb { conn })
    }

    /// Open an in-memory database, mainly for tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(
            "CREATE TABLE commands (
                output_path TEXT PRIMARY KEY,
                quoted_command TEXT NOT NULL,
                output TEXT NOT NULL,
                toolchain_hash TEXT NOT NULL,
                duration_ms INTEGER NOT NULL
            );
            CREATE TABLE inputs (
                command_output_path TEXT NOT NULL,
                input_path TEXT NOT NULL,
                prev_mtime INTEGER NOT NULL,
                UNIQUE(command_output_path, input_path)
            );",
        )?;
        Ok(FingerprintDb { conn })
    }

    /// Decide whether a task must run, per the should-run predicate:
    /// no prior record, a changed toolchain hash, a changed command, a
    /// stale or missing input, or a missing output all force a rerun.
    pub fn should_run(
        &self,
        output_path: &Path,
        quoted_command: &str,
        toolchain_hash: &str,
    ) -> Result<bool> {
        if !output_path.exists() {
            return Ok(true);
        }

        let output_key = output_path.to_string_lossy().into_owned();

        let row: Option<(String, String)> = self
            .conn
            .query_row(
                "SELECT quoted_command, toolchain_hash FROM commands WHERE output_path = ?1",
                params![output_key],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .optional()?;

        let Some((stored_command, stored_toolchain_hash)) = row else {
            return Ok(true);
        };

        if stored_toolchain_hash != toolchain_hash || stored_command != quoted_command {
            return Ok(true);
        }

        let mut stmt = self
            .conn
            .prepare("SELECT input_path, prev_mtime FROM inputs WHERE command_output_path = ?1")?;
        let mut rows = stmt.query(params![output_key])?;

        while let Some(row) = rows.next()? {
            let input_path: String = row.get(0)?;
            let prev_mtime: i64 = row.get(1)?;
            let input = Path::new(&input_path);

            match mtime_secs(input) {
                Some(current) if current as i64 <= prev_mtime => {}
                _ => return Ok(true),
            }
        }

        Ok(false)
    }

    /// Record a successful task: replace its `commands` row and its full
    /// `inputs` set in a single transaction.
    pub fn record_success(
        &mut self,
        output_path: &Path,
        quoted_command: &str,
        output: &str,
        toolchain_hash: &str,
        duration_ms: u64,
        inputs: &[PathBuf],
    ) -> Result<()> {
        let output_key = output_path.to_string_lossy().into_owned();
        let tx = self.conn.transaction()?;

        tx.execute(
            "INSERT INTO commands (output_path, quoted_command, output, toolchain_hash, duration_ms)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(output_path) DO UPDATE SET
                quoted_command = excluded.quoted_command,
                output = excluded.output,
                toolchain_hash = excluded.toolchain_hash,
                duration_ms = excluded.duration_ms",
            params![output_key, quoted_command, output, toolchain_hash, duration_ms as i64],
        )?;

        tx.execute(
            "DELETE FROM inputs WHERE command_output_path = ?1",
            params![output_key],
        )?;

        for input in inputs {
            let mtime = mtime_secs(input).unwrap_or(0);
            tx.execute(
                "INSERT INTO inputs (command_output_path, input_path, prev_mtime) VALUES (?1, ?2, ?3)",
                params![output_key, input.to_string_lossy().into_owned(), mtime as i64],
            )?;
        }

        tx.commit()?;
        Ok(())
    }
}

fn mtime_secs(path: &Path) -> Option<u64> {
    let metadata = std::fs::metadata(path).ok()?;
    let modified = metadata.modified().ok()?;
    modified
        .duration_since(SystemTime::UNIX_EPOCH)
        .ok()
        .map(|d| d.as_secs())
}

/// Parsed result of a toolchain's dependency report for one compile.
pub struct DependencyReport {
    /// Header/input files discovered for this compile, beyond the source itself.
    pub inputs: Vec<PathBuf>,
    /// Compiler output with dependency-report noise stripped, for display.
    pub cleaned_output: String,
}

/// Parse a toolchain's captured compiler output per its `deps_mode` and
/// recover the compile's header input set.
pub fn parse_dependency_report(mode: DepsMode, raw_output: &str, source: &Path) -> DependencyReport {
    match mode {
        DepsMode::None => DependencyReport {
            inputs: vec![source.to_path_buf()],
            cleaned_output: raw_output.to_string(),
        },
        DepsMode::GnuMakefile => parse_gnu_makefile_deps(raw_output, source),
        DepsMode::MsvcPrefix => parse_msvc_prefix_deps(raw_output, source),
    }
}

/// Parse a Makefile-style `target: prereq1 prereq2 \` block, honoring line
/// continuations. A block with no colon is malformed and yields no inputs
/// at all, not even the source.
fn parse_gnu_makefile_deps(raw: &str, source: &Path) -> DependencyReport {
    let Some(colon) = raw.find(':') else {
        return DependencyReport {
            inputs: Vec::new(),
            cleaned_output: String::new(),
        };
    };

    let mut inputs = vec![source.to_path_buf()];
    let mut body = raw[colon + 1..].to_string();
    // Join line continuations before splitting on whitespace.
    body = body.replace("\\\r\n", " ").replace("\\\n", " ");

    for token in body.split_whitespace() {
        let path = PathBuf::from(token);
        if path != source && !inputs.contains(&path) {
            inputs.push(path);
        }
    }

    DependencyReport {
        inputs,
        cleaned_output: String::new(),
    }
}

/// Scan for MSVC's `/showIncludes` lines; everything else is kept as the
/// cleaned output.
fn parse_msvc_prefix_deps(raw: &str, source: &Path) -> DependencyReport {
    const PREFIX: &str = "Note: including file:";
    let mut inputs = vec![source.to_path_buf()];
    let mut cleaned = String::new();

    for line in raw.lines() {
        if let Some(rest) = line.trim_start().strip_prefix(PREFIX) {
            let path = PathBuf::from(rest.trim());
            if !inputs.contains(&path) {
                inputs.push(path);
            }
        } else {
            cleaned.push_str(line);
            cleaned.push('\n');
        }
    }

    DependencyReport {
        inputs,
        cleaned_output: cleaned,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_should_run_missing_output() {
        let db = FingerprintDb::open_in_memory().unwrap();
        assert!(db
            .should_run(Path::new("/nonexistent/out.o"), "cc -c a.c", "hash1")
            .unwrap());
    }

    #[test]
    fn test_should_run_no_prior_record() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("a.o");
        std::fs::write(&out, b"obj").unwrap();

        let db = FingerprintDb::open_in_memory().unwrap();
        assert!(db.should_run(&out, "cc -c a.c", "hash1").unwrap());
    }

    #[test]
    fn test_record_then_up_to_date() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("a.c");
        std::fs::write(&source, "int main(){}").unwrap();
        let out = tmp.path().join("a.o");
        std::fs::write(&out, b"obj").unwrap();

        let mut db = FingerprintDb::open_in_memory().unwrap();
        db.record_success(&out, "cc -c a.c", "", "hash1", 42, &[source.clone()])
            .unwrap();

        assert!(!db.should_run(&out, "cc -c a.c", "hash1").unwrap());
    }

    #[test]
    fn test_toolchain_hash_change_forces_rerun() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("a.c");
        std::fs::write(&source, "int main(){}").unwrap();
        let out = tmp.path().join("a.o");
        std::fs::write(&out, b"obj").unwrap();

        let mut db = FingerprintDb::open_in_memory().unwrap();
        db.record_success(&out, "cc -c a.c", "", "hash1", 42, &[source.clone()])
            .unwrap();

        assert!(db.should_run(&out, "cc -c a.c", "hash2").unwrap());
    }

    #[test]
    fn test_command_change_forces_rerun() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("a.c");
        std::fs::write(&source, "int main(){}").unwrap();
        let out = tmp.path().join("a.o");
        std::fs::write(&out, b"obj").unwrap();

        let mut db = FingerprintDb::open_in_memory().unwrap();
        db.record_success(&out, "cc -c a.c", "", "hash1", 42, &[source.clone()])
            .unwrap();

        assert!(db
            .should_run(&out, "cc -O2 -c a.c", "hash1")
            .unwrap());
    }

    #[test]
    fn test_stale_input_forces_rerun() {
        let tmp = TempDir::new().unwrap();
        let header = tmp.path().join("a.h");
        std::fs::write(&header, "int f();").unwrap();
        let source = tmp.path().join("a.c");
        std::fs::write(&source, "#include \"a.h\"").unwrap();
        let out = tmp.path().join("a.o");
        std::fs::write(&out, b"obj").unwrap();

        let mut db = FingerprintDb::open_in_memory().unwrap();
        db.record_success(
            &out,
            "cc -c a.c",
            "",
            "hash1",
            10,
            &[source.clone(), header.clone()],
        )
        .unwrap();
        assert!(!db.should_run(&out, "cc -c a.c", "hash1").unwrap());

        std::thread::sleep(std::time::Duration::from_millis(1100));
        std::fs::write(&header, "int f(int);").unwrap();

        assert!(db.should_run(&out, "cc -c a.c", "hash1").unwrap());
    }

    #[test]
    fn test_missing_input_forces_rerun() {
        let tmp = TempDir::new().unwrap();
        let header = tmp.path().join("a.h");
        std::fs::write(&header, "int f();").unwrap();
        let source = tmp.path().join("a.c");
        std::fs::write(&source, "#include \"a.h\"").unwrap();
        let out = tmp.path().join("a.o");
        std::fs::write(&out, b"obj").unwrap();

        let mut db = FingerprintDb::open_in_memory().unwrap();
        db.record_success(
            &out,
            "cc -c a.c",
            "",
            "hash1",
            10,
            &[source.clone(), header.clone()],
        )
        .unwrap();

        std::fs::remove_file(&header).unwrap();
        assert!(db.should_run(&out, "cc -c a.c", "hash1").unwrap());
    }

    #[test]
    fn test_parse_gnu_makefile_deps() {
        let source = PathBuf::from("src/a.c");
        let raw = "a.o: src/a.c src/a.h \\\n  src/common.h\n";
        let report = parse_dependency_report(DepsMode::GnuMakefile, raw, &source);
        assert!(report.inputs.contains(&PathBuf::from("src/a.h")));
        assert!(report.inputs.contains(&PathBuf::from("src/common.h")));
    }

    #[test]
    fn test_parse_gnu_makefile_deps_malformed() {
        let source = PathBuf::from("src/a.c");
        let raw = "not a makefile rule at all";
        let report = parse_dependency_report(DepsMode::GnuMakefile, raw, &source);
        assert!(report.inputs.is_empty());
        assert!(report.cleaned_output.is_empty());
    }

    #[test]
    fn test_parse_msvc_prefix_deps() {
        let source = PathBuf::from("a.cpp");
        let raw = "a.cpp\nNote: including file: C:\\inc\\a.h\nNote: including file:  C:\\inc\\b.h\n";
        let report = parse_dependency_report(DepsMode::MsvcPrefix, raw, &source);
        assert!(report.inputs.iter().any(|p| p.ends_with("a.h")));
        assert!(report.inputs.iter().any(|p| p.ends_with("b.h")));
        assert!(!report.cleaned_output.contains("Note: including file"));
        assert!(report.cleaned_output.contains("a.cpp"));
    }

    #[test]
    fn test_parse_none_deps() {
        let source = PathBuf::from("a.c");
        let report = parse_dependency_report(DepsMode::None, "", &source);
        assert_eq!(report.inputs, vec![source]);
    }
}
