//! Protobuf schema compilation

use mockwire_core::{Error, GrpcMethodId, Result};
use prost::Message as _;
use prost_reflect::{DescriptorPool, FileDescriptor, MethodDescriptor, ServiceDescriptor};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File extension of schema sources
pub const PROTO_EXTENSION: &str = "proto";

/// Compiles `.proto` sources into a descriptor pool
#[derive(Debug, Clone, Default)]
pub struct SchemaCompiler {
    /// Extra import directories, searched after the source root
    import_paths: Vec<PathBuf>,
}

impl SchemaCompiler {
    /// Create a compiler with an ordered list of import directories
    pub fn new<I, P>(import_paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            import_paths: import_paths.into_iter().map(Into::into).collect(),
        }
    }

    /// Import directories in search order (the source root is always first)
    pub fn import_paths(&self) -> &[PathBuf] {
        &self.import_paths
    }

    /// Compile `files` (paths relative to `root`)
    ///
    /// Syntax errors, unresolved imports and type conflicts all fail with
    /// [`Error::Schema`].
    pub fn compile(&self, root: &Path, files: &[PathBuf]) -> Result<CompiledSchema> {
        let mut includes = Vec::with_capacity(self.import_paths.len() + 1);
        includes.push(root.to_path_buf());
        includes.extend(self.import_paths.iter().cloned());

        let mut compiler = protox::Compiler::new(&includes)
            .map_err(|e| Error::Schema(format!("invalid import paths: {e}")))?;
        compiler.include_imports(true);

        for file in files {
            debug!(file = %file.display(), "Compiling schema file");
            compiler
                .open_file(root.join(file))
                .map_err(|e| Error::Schema(format!("{}: {e}", file.display())))?;
        }

        let pool = compiler.descriptor_pool();
        let encoded = compiler.file_descriptor_set().encode_to_vec();

        let compiled = files
            .iter()
            .map(|file| {
                let name = proto_name(file);
                pool.get_file_by_name(&name).ok_or_else(|| {
                    Error::Schema(format!("compiled file '{name}' missing from descriptor pool"))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        info!(
            files = compiled.len(),
            services = compiled.iter().map(|f| f.services().len()).sum::<usize>(),
            "Schema compiled"
        );

        Ok(CompiledSchema {
            pool,
            files: compiled,
            encoded,
        })
    }
}

/// Protobuf file name: path relative to its include root, `/`-separated
fn proto_name(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Result of a schema compilation
///
/// Shared read-only for the lifetime of the process.
#[derive(Debug, Clone)]
pub struct CompiledSchema {
    pool: DescriptorPool,
    files: Vec<FileDescriptor>,
    /// Encoded `FileDescriptorSet`, imports included (served by reflection)
    encoded: Vec<u8>,
}

impl CompiledSchema {
    /// Descriptor pool holding every compiled and imported file
    pub fn pool(&self) -> &DescriptorPool {
        &self.pool
    }

    /// The files that were compiled directly (imports excluded), in input order
    pub fn files(&self) -> &[FileDescriptor] {
        &self.files
    }

    /// Every service declared by the compiled files
    pub fn services(&self) -> impl Iterator<Item = ServiceDescriptor> + '_ {
        self.files.iter().flat_map(|file| file.services())
    }

    /// Every method declared by the compiled files, with its identifier
    pub fn methods(&self) -> impl Iterator<Item = (GrpcMethodId, MethodDescriptor)> + '_ {
        self.services().flat_map(|service| {
            service
                .methods()
                .map(|method| {
                    let id = GrpcMethodId::new(
                        service.package_name(),
                        service.name(),
                        method.name(),
                    );
                    (id, method)
                })
                .collect::<Vec<_>>()
        })
    }

    /// Look up a method by identifier
    pub fn find_method(&self, id: &GrpcMethodId) -> Option<MethodDescriptor> {
        self.pool
            .get_service_by_name(&id.service_name())
            .and_then(|service| service.methods().find(|m| m.name() == id.method))
    }

    /// Encoded `FileDescriptorSet` of all files
    pub fn encoded_file_descriptor_set(&self) -> &[u8] {
        &self.encoded
    }
}
