//! gRPC server reflection
//!
//! Clients such as `grpcurl` discover the mocked services through the
//! standard reflection protocol, answered from the compiled schema.

use super::dispatcher::MethodTable;
use mockwire_core::{Error, Result};
use mockwire_schema::CompiledSchema;
use tonic::codegen::Service;
use tonic_reflection::server::Builder;

/// Path of the v1 reflection stream
pub const REFLECTION_V1_PATH: &str = "/grpc.reflection.v1.ServerReflection/ServerReflectionInfo";

/// Path of the v1alpha reflection stream
pub const REFLECTION_V1ALPHA_PATH: &str =
    "/grpc.reflection.v1alpha.ServerReflection/ServerReflectionInfo";

/// Add both reflection versions to `methods`
pub fn register(methods: &mut MethodTable, schema: &CompiledSchema) -> Result<()> {
    let descriptors = schema.encoded_file_descriptor_set();

    let v1 = Builder::configure()
        .register_encoded_file_descriptor_set(descriptors)
        .build_v1()
        .map_err(|e| Error::Schema(format!("failed to build reflection service: {}", e)))?;

    let v1alpha = Builder::configure()
        .register_encoded_file_descriptor_set(descriptors)
        .build_v1alpha()
        .map_err(|e| Error::Schema(format!("failed to build reflection service: {}", e)))?;

    methods.insert(REFLECTION_V1_PATH, move |req| {
        let mut service = v1.clone();
        Box::pin(async move {
            match service.call(req).await {
                Ok(response) => response,
                Err(never) => match never {},
            }
        })
    });

    methods.insert(REFLECTION_V1ALPHA_PATH, move |req| {
        let mut service = v1alpha.clone();
        Box::pin(async move {
            match service.call(req).await {
                Ok(response) => response,
                Err(never) => match never {},
            }
        })
    });

    tracing::debug!("gRPC reflection registered");
    Ok(())
}
