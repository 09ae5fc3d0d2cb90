use std::sync::Arc;

use flora_providers::{
	classify::{self, ClassifyVerdict},
	hybrid::{self, HybridQuery, HybridResponse},
	vector::{self, EmbeddingHit, Health},
};

/// The three retrieval collaborators behind one seam, so the pipeline can be
/// exercised against canned responses.
pub trait SearchBackend: Send + Sync {
	fn classify(
		&self,
		query: &str,
	) -> impl Future<Output = color_eyre::Result<ClassifyVerdict>> + Send;
	fn embedding_search(
		&self,
		query: &str,
		top_k: u32,
	) -> impl Future<Output = color_eyre::Result<Vec<EmbeddingHit>>> + Send;
	fn hybrid_search(
		&self,
		request: &HybridQuery<'_>,
		top_k: u32,
	) -> impl Future<Output = color_eyre::Result<HybridResponse>> + Send;
	fn embedding_health(&self) -> impl Future<Output = color_eyre::Result<Health>> + Send;
}

impl<T> SearchBackend for Arc<T>
where
	T: SearchBackend,
{
	async fn classify(&self, query: &str) -> color_eyre::Result<ClassifyVerdict> {
		(**self).classify(query).await
	}

	async fn embedding_search(&self, query: &str, top_k: u32) -> color_eyre::Result<Vec<EmbeddingHit>> {
		(**self).embedding_search(query, top_k).await
	}

	async fn hybrid_search(
		&self,
		request: &HybridQuery<'_>,
		top_k: u32,
	) -> color_eyre::Result<HybridResponse> {
		(**self).hybrid_search(request, top_k).await
	}

	async fn embedding_health(&self) -> color_eyre::Result<Health> {
		(**self).embedding_health().await
	}
}

/// Production backend: plain HTTP calls against the configured providers.
#[derive(Clone)]
pub struct HttpBackend {
	cfg: Arc<flora_config::Config>,
}

impl HttpBackend {
	pub fn new(cfg: Arc<flora_config::Config>) -> Self {
		Self { cfg }
	}
}

impl SearchBackend for HttpBackend {
	async fn classify(&self, query: &str) -> color_eyre::Result<ClassifyVerdict> {
		classify::classify(&self.cfg.providers.classifier, query).await
	}

	async fn embedding_search(&self, query: &str, top_k: u32) -> color_eyre::Result<Vec<EmbeddingHit>> {
		vector::search(&self.cfg.providers.embedding_search, query, top_k).await
	}

	async fn hybrid_search(
		&self,
		request: &HybridQuery<'_>,
		top_k: u32,
	) -> color_eyre::Result<HybridResponse> {
		hybrid::search(&self.cfg.providers.hybrid_search, request, top_k).await
	}

	async fn embedding_health(&self) -> color_eyre::Result<Health> {
		vector::health(&self.cfg.providers.embedding_search).await
	}
}
