//! This module contains the checks that must pass before the programmer
//! is launched.

use std::{
    fmt,
    fs::File,
    io::{self, BufRead, BufReader},
    path::{Path, PathBuf},
};

use enum_iterator::all;
use log::debug;
use which::which;

use crate::{command::LaunchCommand, input_file::InputRole, settings::Settings};

#[derive(Debug)]
pub enum PreflightError {
    /// The programmer binary cannot be found.
    ToolNotFound(PathBuf),
    /// An input file does not exist.
    MissingFile { role: InputRole, path: PathBuf },
    /// An input file's first line does not look like its expected format.
    BadSignature { role: InputRole, path: PathBuf },
    /// An input file exists but cannot be read.
    Unreadable {
        role: InputRole,
        path: PathBuf,
        err: io::Error,
    },
}

impl fmt::Display for PreflightError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use PreflightError::*;
        match self {
            ToolNotFound(p) => write!(f, "Programmer not found: {}", p.display()),
            MissingFile { role, path } => write!(f, "The {} file does not exist: {}", role, path.display()),
            BadSignature { role, path } => write!(f, "Invalid {} file: {}", role, path.display()),
            Unreadable { role, path, err } => write!(f, "Cannot read {} file {}: {}", role, path.display(), err),
        }
    }
}

impl PreflightError {
    /// The path the error is about.
    pub fn path(&self) -> &Path {
        use PreflightError::*;
        match self {
            ToolNotFound(p) => p,
            MissingFile { path, .. } | BadSignature { path, .. } | Unreadable { path, .. } => path,
        }
    }
}

/// Check the tool and all three input files, stopping at the first problem.
pub fn check(settings: &Settings) -> Result<(), PreflightError> {
    let tool = resolve_tool(&settings.tool_path).ok_or_else(|| PreflightError::ToolNotFound(settings.tool_path.clone()))?;
    debug!("Programmer resolved to {:?}", tool);

    for role in all::<InputRole>() {
        check_input_file(role, settings.files.get(role))?;
    }
    Ok(())
}

/// Check `settings`, then persist them to `config_path` and build the command to run.
///
/// Nothing is written if a check fails.
pub fn prepare_run(settings: &Settings, config_path: &Path) -> Result<LaunchCommand, PreflightError> {
    check(settings)?;
    settings.save(config_path);
    Ok(LaunchCommand::build(settings))
}

/// Find the programmer binary.
///
/// A bare name is looked up in `$PATH`; anything else must be an existing file.
pub fn resolve_tool(path: &Path) -> Option<PathBuf> {
    if path.as_os_str().is_empty() {
        return None;
    }
    if path.is_absolute() || path.components().count() > 1 {
        return path.is_file().then(|| path.to_path_buf());
    }
    which(path).ok()
}

/// Check that an input file exists and passes its sniff test.
pub fn check_input_file(role: InputRole, path: &Path) -> Result<(), PreflightError> {
    if !path.is_file() {
        return Err(PreflightError::MissingFile {
            role,
            path: path.to_path_buf(),
        });
    }
    let line = read_first_line(path).map_err(|err| PreflightError::Unreadable {
        role,
        path: path.to_path_buf(),
        err,
    })?;
    if role.accepts_first_line(&line) {
        Ok(())
    } else {
        Err(PreflightError::BadSignature {
            role,
            path: path.to_path_buf(),
        })
    }
}

/// Read the first line of a file; bytes that are not UTF-8 are replaced.
fn read_first_line(path: &Path) -> io::Result<String> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut buf = vec![];
    reader.read_until(b'\n', &mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

#[cfg(test)]
mod test {
    use std::{fs, path::Path};

    use tempfile::TempDir;

    use crate::{
        command::LaunchCommand,
        input_file::InputRole,
        settings::{InputFiles, Settings},
    };

    use super::{check, check_input_file, prepare_run, PreflightError};

    const HEX: &str = ":10010000214601360121470136007EFE09D2190140\n:00000001FF\n";
    const SREC: &str = "S00F000068656C6C6F202020202000003C\nS9030000FC\n";

    /// A directory with a fake programmer and three valid input files.
    fn workspace() -> (TempDir, Settings) {
        let dir = tempfile::tempdir().unwrap();
        let p = |name: &str| dir.path().join(name);
        fs::write(p("STVP_CmdLine"), "#!/bin/sh\n").unwrap();
        fs::write(p("main.s19"), SREC).unwrap();
        fs::write(p("data.hex"), HEX).unwrap();
        fs::write(p("opt.hex"), HEX).unwrap();
        let settings = Settings {
            tool_path: p("STVP_CmdLine"),
            files: InputFiles {
                program: p("main.s19"),
                data: p("data.hex"),
                options: p("opt.hex"),
            },
            ..Settings::default()
        };
        (dir, settings)
    }

    #[test]
    fn valid_workspace_passes() {
        let (_dir, settings) = workspace();
        check(&settings).unwrap();
    }

    #[test]
    fn missing_tool_is_reported_first() {
        let (dir, mut settings) = workspace();
        settings.tool_path = dir.path().join("does-not-exist.exe");
        settings.files.data = dir.path().join("also-missing.hex");
        let err = check(&settings).unwrap_err();
        assert!(matches!(err, PreflightError::ToolNotFound(_)));
        assert_eq!(err.path(), settings.tool_path.as_path());
        assert!(err.to_string().contains("does-not-exist.exe"));
    }

    #[test]
    fn empty_tool_path_is_rejected() {
        let (_dir, mut settings) = workspace();
        settings.tool_path = "".into();
        assert!(matches!(check(&settings), Err(PreflightError::ToolNotFound(_))));
    }

    #[test]
    fn directory_as_tool_is_rejected() {
        let (dir, mut settings) = workspace();
        settings.tool_path = dir.path().to_path_buf();
        assert!(matches!(check(&settings), Err(PreflightError::ToolNotFound(_))));
    }

    #[test]
    fn missing_input_file_names_the_path() {
        let (dir, mut settings) = workspace();
        settings.files.options = dir.path().join("gone.hex");
        match check(&settings) {
            Err(PreflightError::MissingFile { role, path }) => {
                assert_eq!(role, InputRole::Options);
                assert_eq!(path, dir.path().join("gone.hex"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn srecord_is_not_valid_data() {
        let (dir, mut settings) = workspace();
        settings.files.data = dir.path().join("main.s19");
        let err = check(&settings).unwrap_err();
        assert!(matches!(
            err,
            PreflightError::BadSignature {
                role: InputRole::Data,
                ..
            }
        ));
        assert!(err.to_string().contains("main.s19"));
    }

    #[test]
    fn empty_file_fails_sniff_test() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.hex");
        fs::write(&path, "").unwrap();
        for role in enum_iterator::all::<InputRole>() {
            assert!(matches!(
                check_input_file(role, &path),
                Err(PreflightError::BadSignature { .. })
            ));
        }
    }

    #[test]
    fn binary_garbage_fails_sniff_test() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fw.hex");
        fs::write(&path, [0xffu8, 0xfe, 0x00, b'\n', b':']).unwrap();
        assert!(check_input_file(InputRole::Program, &path).is_err());
    }

    #[test]
    fn only_first_line_matters() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fw.hex");
        fs::write(&path, "garbage\n:00000001FF\n").unwrap();
        assert!(check_input_file(InputRole::Data, Path::new(&path)).is_err());
        fs::write(&path, ":00000001FF\ngarbage\n").unwrap();
        assert!(check_input_file(InputRole::Data, Path::new(&path)).is_ok());
    }

    #[test]
    fn rejected_start_leaves_config_untouched() {
        let (dir, mut settings) = workspace();
        let config = dir.path().join("stm8_config.json");
        let before = "{\"cli_path\": \"old\", \"model\": \"STM8L151\"}";
        fs::write(&config, before).unwrap();

        settings.tool_path = dir.path().join("does-not-exist.exe");
        assert!(matches!(
            prepare_run(&settings, &config),
            Err(PreflightError::ToolNotFound(_))
        ));
        assert_eq!(fs::read_to_string(&config).unwrap(), before);
    }

    #[test]
    fn rejected_start_creates_no_config() {
        let (dir, mut settings) = workspace();
        let config = dir.path().join("stm8_config.json");
        settings.files.program = dir.path().join("gone.s19");
        assert!(prepare_run(&settings, &config).is_err());
        assert!(!config.exists());
    }

    #[test]
    fn accepted_start_saves_and_builds() {
        let (dir, settings) = workspace();
        let config = dir.path().join("stm8_config.json");
        fs::write(&config, "{}").unwrap();

        let command = prepare_run(&settings, &config).unwrap();
        assert_eq!(command, LaunchCommand::build(&settings));
        assert_eq!(Settings::try_load(&config).unwrap(), settings);
    }
}
