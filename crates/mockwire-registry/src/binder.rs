//! Binding of discovered gRPC scripts to schema methods

use mockwire_core::{GrpcMethodId, MockDefinition, MockId};
use mockwire_schema::prost_reflect::MethodDescriptor;
use mockwire_schema::CompiledSchema;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// A script paired with the schema method it implements
#[derive(Debug, Clone)]
pub struct BoundMock {
    /// Method identifier
    pub id: GrpcMethodId,
    /// The script
    pub definition: Arc<MockDefinition>,
    /// Resolved method descriptor (input and output types)
    pub method: MethodDescriptor,
}

impl BoundMock {
    /// Request path the method is served at
    pub fn path(&self) -> String {
        self.id.path()
    }
}

/// Pair every compiled unary method with its script
///
/// Methods without a script are left out. Scripts without a method are
/// dropped. Streaming methods are never bound.
pub fn bind(schema: &CompiledSchema, mocks: Vec<MockDefinition>) -> Vec<BoundMock> {
    let mut scripts: HashMap<GrpcMethodId, MockDefinition> = mocks
        .into_iter()
        .filter_map(|mock| match &mock.id {
            MockId::Grpc(id) => Some((id.clone(), mock)),
            MockId::Http(_) => None,
        })
        .collect();

    let mut bound = Vec::new();
    for (id, method) in schema.methods() {
        let Some(definition) = scripts.remove(&id) else {
            debug!(method = %id, "No script for method, leaving it unimplemented");
            continue;
        };

        if method.is_client_streaming() || method.is_server_streaming() {
            warn!(
                method = %id,
                path = %definition.source_path.display(),
                "Skipping streaming method: only unary methods can be mocked"
            );
            continue;
        }

        debug!(method = %id, "Bound gRPC mock");
        bound.push(BoundMock {
            id,
            definition: Arc::new(definition),
            method,
        });
    }

    for (id, definition) in scripts {
        debug!(
            method = %id,
            path = %definition.source_path.display(),
            "Script does not match any schema method"
        );
    }

    bound
}
