//! Cached, role-aware OLAP query execution

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::domain::model::SemanticModel;
use crate::domain::query::{OlapRequest, OlapResult, QueryError};
use crate::domain::result_cache::ResultCacheKey;

use super::access_control::AccessControlInjector;
use super::query_router::{QueryRouter, RouteOptions};
use super::result_cache::ResultCache;

/// Single entry point for OLAP requests.
///
/// Published queries on cache-enabled models read through and write through
/// the result cache. Drafts skip the cache and carry no roles.
#[derive(Debug)]
pub struct OlapQueryService {
    router: Arc<QueryRouter>,
    cache: Arc<ResultCache>,
    access: AccessControlInjector,
}

impl OlapQueryService {
    pub fn new(router: Arc<QueryRouter>, cache: Arc<ResultCache>) -> Self {
        Self {
            router,
            cache,
            access: AccessControlInjector::new(),
        }
    }

    #[instrument(skip(self, model, request, cancel), fields(model_id = %model.id(), request_id = %request.id))]
    pub async fn query(
        &self,
        model: &SemanticModel,
        request: &OlapRequest,
        cancel: Option<CancellationToken>,
    ) -> Result<OlapResult, QueryError> {
        let language = model.effective_language(request.accept_language.as_deref());
        let tenant_id = request
            .user
            .tenant_id
            .as_deref()
            .or(model.tenant_id());

        let cache_key = (model.cache_enabled() && !request.is_draft).then(|| {
            ResultCacheKey::new(
                tenant_id,
                model.id().as_str(),
                language.as_deref(),
                &request.body,
            )
        });

        if let Some(key) = &cache_key {
            if !request.force_refresh {
                if let Some(payload) = self.cache.get(key, model.preferences().expires).await {
                    return Ok(OlapResult::cached(payload));
                }
            }
        }

        let roles =
            self.access
                .effective_roles(model, request.user.id.as_deref(), request.is_draft);
        let mut options = RouteOptions::new(&request.session_id)
            .with_language(language)
            .with_role_header(self.access.role_header(&roles));
        if let Some(cancel) = cancel {
            options = options.with_cancel(cancel);
        }

        let payload = self.router.route(model, &request.body, &options).await?;

        if let Some(key) = &cache_key {
            let stored = if request.force_refresh {
                self.cache.refresh(key, &payload).await
            } else {
                self.cache.put(key, &payload).await
            };
            debug!(stored, "Fetched fresh OLAP result");
        }

        Ok(OlapResult::fresh(payload))
    }
}
