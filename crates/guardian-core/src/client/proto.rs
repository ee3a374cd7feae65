//! Wire types and client for the `prompt_api.PromptService` plugin contract.
//!
//! ```proto
//! service PromptService {
//!   rpc SendPrompt(SendPromptRequest) returns (SendPromptResponse);
//! }
//! message SendPromptRequest {
//!   string prompt = 1;
//!   string chat = 2;
//!   string user_id = 3;
//!   string target_id = 4;
//! }
//! message SendPromptResponse {
//!   bool status = 1;
//!   oneof optional_score { uint32 score = 2; }
//! }
//! ```

use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::Channel;

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SendPromptRequest {
    #[prost(string, tag = "1")]
    pub prompt: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub chat: ::prost::alloc::string::String,
    #[prost(string, tag = "3")]
    pub user_id: ::prost::alloc::string::String,
    #[prost(string, tag = "4")]
    pub target_id: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SendPromptResponse {
    #[prost(bool, tag = "1")]
    pub status: bool,
    #[prost(oneof = "send_prompt_response::OptionalScore", tags = "2")]
    pub optional_score: ::core::option::Option<send_prompt_response::OptionalScore>,
}

pub mod send_prompt_response {
    #[derive(Clone, Copy, PartialEq, ::prost::Oneof)]
    pub enum OptionalScore {
        #[prost(uint32, tag = "2")]
        Score(u32),
    }
}

const SEND_PROMPT_PATH: &str = "/prompt_api.PromptService/SendPrompt";

/// Unary client for `PromptService`. Cheap to construct per call; the
/// underlying [`Channel`] is shared.
#[derive(Debug, Clone)]
pub struct PromptServiceClient {
    inner: tonic::client::Grpc<Channel>,
}

impl PromptServiceClient {
    pub fn new(channel: Channel) -> Self {
        Self {
            inner: tonic::client::Grpc::new(channel),
        }
    }

    pub async fn send_prompt(
        &mut self,
        request: impl tonic::IntoRequest<SendPromptRequest>,
    ) -> Result<tonic::Response<SendPromptResponse>, tonic::Status> {
        self.inner
            .ready()
            .await
            .map_err(|e| tonic::Status::unknown(format!("service was not ready: {}", e)))?;
        let codec = tonic::codec::ProstCodec::default();
        let path = PathAndQuery::from_static(SEND_PROMPT_PATH);
        self.inner.unary(request.into_request(), path, codec).await
    }
}
