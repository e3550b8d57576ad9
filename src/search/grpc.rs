//! tonic client for `vectorsearch.VectorSearchService`.
//!
//! Messages are declared with prost derives instead of build-time codegen; field tags match
//! the service's proto.

use super::{SearchError, SearchHit, SearchQuery, VectorSearch};
use crate::deadline::Deadline;
use async_trait::async_trait;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::{Channel, Endpoint};

const SEARCH_PATH: &str = "/vectorsearch.VectorSearchService/Search";

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SearchRequest {
    #[prost(string, tag = "1")]
    pub query: String,
    #[prost(int32, tag = "2")]
    pub k: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SearchResult {
    #[prost(string, tag = "1")]
    pub uid: String,
    #[prost(float, tag = "2")]
    pub score: f32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SearchResponse {
    #[prost(message, repeated, tag = "1")]
    pub results: Vec<SearchResult>,
}

/// [`VectorSearch`] over a tonic channel.
#[derive(Debug, Clone)]
pub struct GrpcVectorSearch {
    channel: Channel,
}

impl GrpcVectorSearch {
    /// Wrap an existing channel.
    pub fn new(channel: Channel) -> Self {
        Self { channel }
    }

    /// Build a channel that connects on first use, e.g. `http://127.0.0.1:50051`.
    pub fn connect_lazy(endpoint: &str) -> Result<Self, SearchError> {
        let endpoint = Endpoint::from_shared(endpoint.to_string())
            .map_err(|e| SearchError::Transport(e.to_string()))?;
        Ok(Self { channel: endpoint.connect_lazy() })
    }
}

#[async_trait]
impl VectorSearch for GrpcVectorSearch {
    async fn search(
        &self,
        query: &SearchQuery,
        deadline: Deadline,
    ) -> Result<Vec<SearchHit>, SearchError> {
        let mut grpc = tonic::client::Grpc::new(self.channel.clone());
        grpc.ready().await.map_err(|e| SearchError::Transport(e.to_string()))?;

        let mut request = tonic::Request::new(SearchRequest {
            query: query.text().to_string(),
            k: i32::try_from(query.k()).unwrap_or(i32::MAX),
        });
        // Sent as `grpc-timeout` so the server can give up too.
        request.set_timeout(deadline.remaining());

        let codec = tonic::codec::ProstCodec::<SearchRequest, SearchResponse>::default();
        let path = PathAndQuery::from_static(SEARCH_PATH);
        let response = grpc.unary(request, path, codec).await.map_err(|status| {
            SearchError::Status {
                code: format!("{:?}", status.code()),
                message: status.message().to_string(),
            }
        })?;

        Ok(response
            .into_inner()
            .results
            .into_iter()
            .map(|r| SearchHit { uid: r.uid, score: r.score })
            .collect())
    }
}
