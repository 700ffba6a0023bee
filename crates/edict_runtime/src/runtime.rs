//! A VM bound to a root scope of host natives.

use std::path::PathBuf;
use std::sync::Arc;

use edict_listree::NodeRef;
use edict_vm::{HostReflector, Outcome, Vm, VmConfig};
use thiserror::Error;
use tracing::{debug, warn};

use crate::cli::CliConfig;
use crate::natives::{self, Output};

/// Errors from the runtime layer.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Bad command line.
    #[error("{0}")]
    Usage(String),

    /// A script file could not be read.
    #[error("cannot read {}: {source}", path.display())]
    Io {
        /// The script path.
        path: PathBuf,
        /// The underlying failure.
        #[source]
        source: std::io::Error,
    },

    /// The interpreter failed.
    #[error(transparent)]
    Edict(#[from] edict_foundation::Error),
}

/// A VM whose root scope is the host module.
pub struct Runtime {
    vm: Vm,
    root: NodeRef,
    output: Output,
}

impl Runtime {
    /// Creates a runtime writing to standard output.
    ///
    /// # Errors
    /// Returns an error if the natives cannot be installed.
    pub fn new(config: &CliConfig) -> Result<Self, RuntimeError> {
        Self::with_output(config, Output::Stdout)
    }

    /// Creates a runtime writing to `output`.
    ///
    /// # Errors
    /// Returns an error if the natives cannot be installed.
    pub fn with_output(config: &CliConfig, output: Output) -> Result<Self, RuntimeError> {
        let host = Arc::new(HostReflector::new());
        natives::install(&host, &output)?;
        let root = host.module();
        let vm_config = if config.trace_vm {
            VmConfig::debug()
        } else {
            VmConfig::default()
        };
        Ok(Self {
            vm: Vm::new(host).with_config(vm_config),
            root,
            output,
        })
    }

    /// Returns the root scope.
    #[must_use]
    pub fn root(&self) -> &NodeRef {
        &self.root
    }

    /// Returns the output sink.
    #[must_use]
    pub fn output(&self) -> &Output {
        &self.output
    }

    /// Compiles and runs `source` with the root scope as its outermost
    /// scope. Bindings made at the top level persist across runs.
    ///
    /// # Errors
    /// Returns compile errors and fatal VM errors. Uncaught exceptions are
    /// reported in the [`Outcome`].
    pub fn run(&mut self, source: &str) -> Result<Outcome, RuntimeError> {
        debug!(bytes = source.len(), "running script");
        let outcome = self.vm.evaluate(&self.root, source)?;
        if outcome.is_throwing() {
            warn!(count = outcome.exceptions.len(), "script ended with uncaught exceptions");
        }
        Ok(outcome)
    }
}
