//! Name to module resolution

use crate::packages;
use crate::CommandContext;
use kernel_api::{Node, ShellError, Storage, StorageError};
use serde::{Deserialize, Serialize};
use services_process_manager::panic_message;
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};

/// Directory holding module manifests
pub const BIN_DIR: &str = "/bin";

/// Manifest format understood by this loader
pub const MANIFEST_VERSION: u32 = 1;

/// A command implementation compiled into the binary
pub trait CommandModule {
    /// Implementation name referenced by manifests
    fn name(&self) -> &'static str;

    /// One-line summary for `pkg list`
    fn description(&self) -> &'static str;

    /// Runs the command; a returned string becomes the stage's stdout
    fn execute(
        &self,
        args: &[String],
        ctx: &mut CommandContext<'_>,
    ) -> Result<Option<String>, ShellError>;
}

/// Contents of `/bin/<name>`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleManifest {
    pub module: String,
    pub version: u32,
}

impl ModuleManifest {
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            version: MANIFEST_VERSION,
        }
    }

    pub fn to_json(&self) -> String {
        // A two-field struct of strings and integers always serializes.
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Path of the manifest for a command name
pub fn module_path(name: &str) -> String {
    format!("{}/{}", BIN_DIR, name)
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains('/')
}

/// Registry of compiled implementations plus manifest resolution
pub struct ModuleLoader {
    modules: BTreeMap<&'static str, Box<dyn CommandModule>>,
}

impl ModuleLoader {
    /// Creates a loader with no implementations
    pub fn empty() -> Self {
        Self {
            modules: BTreeMap::new(),
        }
    }

    /// Creates a loader with every package of the catalogue compiled in
    pub fn new() -> Self {
        let mut loader = Self::empty();
        for module in packages::catalogue() {
            loader.register(module);
        }
        loader
    }

    /// Adds (or replaces) a compiled implementation
    pub fn register(&mut self, module: Box<dyn CommandModule>) {
        self.modules.insert(module.name(), module);
    }

    /// Compiled implementations as `(name, description)`
    pub fn available(&self) -> Vec<(&'static str, &'static str)> {
        self.modules
            .values()
            .map(|m| (m.name(), m.description()))
            .collect()
    }

    pub fn is_available(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    /// Resolves a command name through its manifest
    pub fn resolve(&self, name: &str, storage: &dyn Storage) -> Result<&dyn CommandModule, ShellError> {
        if !is_valid_name(name) {
            return Err(ShellError::NotFound(name.to_string()));
        }

        let path = module_path(name);
        let content = match storage.read(&path) {
            Ok(Node::File(content)) => content,
            Ok(Node::Directory(_)) => {
                return Err(ShellError::InvalidModule(format!("{}: not a module file", path)))
            }
            Err(StorageError::NotFound(_)) | Err(StorageError::NotADirectory(_)) => {
                return Err(ShellError::NotFound(name.to_string()))
            }
            Err(err) => return Err(err.into()),
        };

        let manifest: ModuleManifest = serde_json::from_str(&content).map_err(|err| {
            ShellError::InvalidModule(format!("{}: malformed manifest ({})", path, err))
        })?;
        if manifest.version != MANIFEST_VERSION {
            return Err(ShellError::InvalidModule(format!(
                "{}: unsupported manifest version {}",
                path, manifest.version
            )));
        }

        self.modules
            .get(manifest.module.as_str())
            .map(|module| module.as_ref())
            .ok_or_else(|| {
                ShellError::InvalidModule(format!(
                    "{}: no entry point named '{}'",
                    path, manifest.module
                ))
            })
    }

    /// Resolves and runs a command; panics become `ExecutionError`
    pub fn invoke(
        &self,
        name: &str,
        args: &[String],
        ctx: &mut CommandContext<'_>,
    ) -> Result<Option<String>, ShellError> {
        let module = self.resolve(name, ctx.storage())?;
        log::debug!("invoking module '{}' for {}", module.name(), name);

        match panic::catch_unwind(AssertUnwindSafe(|| module.execute(args, ctx))) {
            Ok(result) => result,
            Err(payload) => {
                let reason = panic_message(payload.as_ref());
                log::error!("module '{}' panicked: {}", name, reason);
                Err(ShellError::ExecutionError(format!("{}: {}", name, reason)))
            }
        }
    }

    /// Writes the manifest for a compiled package
    pub fn install(&self, storage: &mut dyn Storage, name: &str) -> Result<(), ShellError> {
        if !self.is_available(name) {
            return Err(ShellError::NotFound(format!("package {}", name)));
        }
        if !storage.exists(BIN_DIR) {
            storage.mkdir(BIN_DIR)?;
        }
        storage.write(&module_path(name), &ModuleManifest::new(name).to_json())?;
        log::info!("installed package {}", name);
        Ok(())
    }

    /// Deletes a command's manifest
    pub fn uninstall(&self, storage: &mut dyn Storage, name: &str) -> Result<(), ShellError> {
        if !is_valid_name(name) {
            return Err(ShellError::InvalidInput(format!("bad package name '{}'", name)));
        }
        storage
            .remove(&module_path(name))
            .map_err(|_| ShellError::NotFound(format!("package {}", name)))?;
        log::info!("removed package {}", name);
        Ok(())
    }

    /// Names present in `/bin`
    pub fn installed(&self, storage: &dyn Storage) -> Vec<String> {
        match storage.read(BIN_DIR) {
            Ok(Node::Directory(entries)) => entries.into_keys().collect(),
            _ => Vec::new(),
        }
    }
}

impl Default for ModuleLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Installs every compiled package; returns how many manifests were written
pub fn install_defaults(loader: &ModuleLoader, storage: &mut dyn Storage) -> usize {
    loader
        .available()
        .into_iter()
        .filter(|(name, _)| match loader.install(storage, name) {
            Ok(()) => true,
            Err(err) => {
                log::warn!("cannot install {}: {}", name, err);
                false
            }
        })
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CommandContext;
    use kernel_api::Storage;
    use services_network::SimulatedNetwork;
    use services_settings::KernelConfig;
    use services_storage::MemoryStorage;
    use sim_kernel::Kernel;

    struct NullTerminal;

    impl kernel_api::Terminal for NullTerminal {
        fn print(&mut self, _text: &str, _style: kernel_api::OutputStyle) {}
        fn update_line(&mut self, _text: &str) {}
        fn set_input_mode(&mut self, _mode: kernel_api::InputMode) {}
        fn clear(&mut self) {}
    }

    struct Explode;

    impl CommandModule for Explode {
        fn name(&self) -> &'static str {
            "explode"
        }
        fn description(&self) -> &'static str {
            "always panics"
        }
        fn execute(
            &self,
            _args: &[String],
            _ctx: &mut CommandContext<'_>,
        ) -> Result<Option<String>, ShellError> {
            panic!("kaboom")
        }
    }

    fn run(loader: &ModuleLoader, storage: &mut MemoryStorage, name: &str) -> Result<Option<String>, ShellError> {
        let mut kernel = Kernel::boot(KernelConfig::default().with_seed(1)).unwrap();
        let pid = kernel.shell_pid();
        let mut terminal = NullTerminal;
        let mut network = SimulatedNetwork::new();
        let stdin = vec!["b".to_string(), "a".to_string()];
        let mut ctx = CommandContext::new(
            &mut kernel,
            storage,
            &mut terminal,
            &mut network,
            pid,
            "/",
            &stdin,
            false,
        );
        loader.invoke(name, &[], &mut ctx)
    }

    #[test]
    fn test_missing_manifest_is_not_found() {
        let loader = ModuleLoader::new();
        let mut storage = MemoryStorage::with_default_layout("user");
        assert_eq!(
            run(&loader, &mut storage, "sort"),
            Err(ShellError::NotFound("sort".to_string()))
        );
    }

    #[test]
    fn test_installed_module_runs() {
        let loader = ModuleLoader::new();
        let mut storage = MemoryStorage::with_default_layout("user");
        loader.install(&mut storage, "sort").unwrap();
        assert_eq!(
            run(&loader, &mut storage, "sort"),
            Ok(Some("a\nb".to_string()))
        );
    }

    #[test]
    fn test_malformed_manifest_is_invalid_module() {
        let loader = ModuleLoader::new();
        let mut storage = MemoryStorage::with_default_layout("user");
        storage.write("/bin/junk", "#!/bin/sh").unwrap();
        assert!(matches!(
            run(&loader, &mut storage, "junk"),
            Err(ShellError::InvalidModule(_))
        ));
    }

    #[test]
    fn test_unknown_entry_point_is_invalid_module() {
        let loader = ModuleLoader::new();
        let mut storage = MemoryStorage::with_default_layout("user");
        storage
            .write("/bin/ghost", &ModuleManifest::new("ghost").to_json())
            .unwrap();
        let err = run(&loader, &mut storage, "ghost").unwrap_err();
        assert_eq!(err.kind(), "InvalidModule");
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn test_directory_is_invalid_module() {
        let loader = ModuleLoader::new();
        let mut storage = MemoryStorage::with_default_layout("user");
        storage.mkdir("/bin/tools").unwrap();
        assert!(matches!(
            run(&loader, &mut storage, "tools"),
            Err(ShellError::InvalidModule(_))
        ));
    }

    #[test]
    fn test_wrong_version_is_invalid_module() {
        let loader = ModuleLoader::new();
        let mut storage = MemoryStorage::with_default_layout("user");
        storage
            .write("/bin/sort", r#"{"module": "sort", "version": 9}"#)
            .unwrap();
        assert!(matches!(
            run(&loader, &mut storage, "sort"),
            Err(ShellError::InvalidModule(_))
        ));
    }

    #[test]
    fn test_panicking_module_is_execution_error() {
        let mut loader = ModuleLoader::empty();
        loader.register(Box::new(Explode));
        let mut storage = MemoryStorage::with_default_layout("user");
        loader.install(&mut storage, "explode").unwrap();

        assert_eq!(
            run(&loader, &mut storage, "explode"),
            Err(ShellError::ExecutionError("explode: kaboom".to_string()))
        );
    }

    #[test]
    fn test_path_like_names_are_not_found() {
        let loader = ModuleLoader::new();
        let mut storage = MemoryStorage::with_default_layout("user");
        assert!(matches!(
            run(&loader, &mut storage, "../etc/motd"),
            Err(ShellError::NotFound(_))
        ));
    }

    #[test]
    fn test_install_defaults_and_uninstall() {
        let loader = ModuleLoader::new();
        let mut storage = MemoryStorage::new();
        let count = install_defaults(&loader, &mut storage);
        assert_eq!(count, loader.available().len());
        assert!(loader.installed(&storage).contains(&"wc".to_string()));

        loader.uninstall(&mut storage, "wc").unwrap();
        assert!(!storage.exists("/bin/wc"));
        assert!(matches!(
            loader.uninstall(&mut storage, "wc"),
            Err(ShellError::NotFound(_))
        ));
        assert!(matches!(
            loader.install(&mut storage, "nonexistent"),
            Err(ShellError::NotFound(_))
        ));
    }
}
