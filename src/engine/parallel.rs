// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Binding several process documents at once.
//!
//! Each document is bound on the tokio blocking pool against one shared, read-only
//! [`Store`]. Documents are independent, so one failing document never affects another.

use super::binder::bind;
use super::execution_graph::ExecutionGraph;
use crate::config::Document;
use crate::errors::{Diagnostic, ErrorKind, Location};
use crate::observability::messages::binder::BatchBindingStarted;
use crate::observability::messages::StructuredLog;
use crate::store::Store;
use std::sync::Arc;
use tokio::task::JoinSet;

/// Outcome of binding one document.
#[derive(Debug, Clone)]
pub struct BoundDocument {
    pub module: String,
    pub origin: String,
    pub result: Result<ExecutionGraph, Vec<Diagnostic>>,
}

impl BoundDocument {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Bind `documents` concurrently; results keep the order of `documents`.
pub async fn bind_documents(store: Arc<Store>, documents: Vec<Document>) -> Vec<BoundDocument> {
    BatchBindingStarted {
        document_count: documents.len(),
    }
    .log();

    let mut join_set: JoinSet<(usize, BoundDocument)> = JoinSet::new();
    let mut pending: Vec<(String, String)> = Vec::with_capacity(documents.len());
    for (position, document) in documents.into_iter().enumerate() {
        pending.push((document.module.clone(), document.origin.clone()));
        let store = Arc::clone(&store);
        join_set.spawn_blocking(move || {
            let result = bind(&store, &document);
            (
                position,
                BoundDocument {
                    module: document.module,
                    origin: document.origin,
                    result,
                },
            )
        });
    }

    let mut slots: Vec<Option<BoundDocument>> = vec![None; pending.len()];
    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok((position, bound)) => {
                if let Some(slot) = slots.get_mut(position) {
                    *slot = Some(bound);
                }
            }
            Err(e) => tracing::error!(error = %e, "Binding task did not complete"),
        }
    }

    // A task that panicked leaves its slot empty
    slots
        .into_iter()
        .zip(pending)
        .map(|(slot, (module, origin))| {
            slot.unwrap_or_else(|| BoundDocument {
                result: Err(vec![Diagnostic::new(
                    Location::document(origin.clone()),
                    ErrorKind::InvalidDeclaration {
                        reason: format!("binding of '{}' did not complete", module),
                    },
                )]),
                module,
                origin,
            })
        })
        .collect()
}
