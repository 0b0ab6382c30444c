//! Typed paths into a case directory.
//!
//! Centralizing path construction keeps every external invocation on
//! absolute paths and prevents drift when the CIME layout evolves.
use std::path::{Path, PathBuf};

/// Convenience wrapper for locating artifacts inside one case directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CasePaths {
    root: PathBuf,
}

impl CasePaths {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Return the case directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Return a case-local script such as `xmlchange` or `case.submit`.
    pub fn script(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Return the `run_state.json` snapshot path.
    pub fn run_state_path(&self) -> PathBuf {
        self.root.join("run_state.json")
    }

    /// Return the `user_nl_elm` override file.
    pub fn user_nl_elm(&self) -> PathBuf {
        self.root.join("user_nl_elm")
    }

    /// Return the `Buildconf/datmconf/` template directory.
    pub fn datm_conf_dir(&self) -> PathBuf {
        self.root.join("Buildconf").join("datmconf")
    }

    /// Return the generated land namelist `Buildconf/elmconf/lnd_in`.
    pub fn lnd_in(&self) -> PathBuf {
        self.root.join("Buildconf").join("elmconf").join("lnd_in")
    }

    /// Return the build macro files patched in bypass mode.
    pub fn macro_files(&self) -> [PathBuf; 2] {
        [self.root.join("Macros.make"), self.root.join("Macros.cmake")]
    }

    /// Return `cmake_macros/universal.cmake`.
    pub fn universal_cmake(&self) -> PathBuf {
        self.root.join("cmake_macros").join("universal.cmake")
    }

    /// Return the `SourceMods/` directory.
    pub fn source_mods(&self) -> PathBuf {
        self.root.join("SourceMods")
    }

    /// Return a log file path inside the case directory.
    pub fn log(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}
