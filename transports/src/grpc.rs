//! gRPC transport and codec for TensorFlow Serving's `PredictionService`
//!
//! [`GrpcCodec`] turns an example into a serialized `PredictRequest` and a
//! serialized `PredictResponse` back into a label. [`GrpcTransport`] ships
//! those bytes over a tonic channel, so the driver sees the same
//! bytes-in, bytes-out shape it gets from [`HttpTransport`](crate::HttpTransport).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use inferbench_core::{
    AsyncTransport, CodecError, CompletionCallback, Example, RequestCodec, Transport,
    TransportError,
};
use prost::Message;
use tokio::runtime::Handle;
use tonic::transport::{Channel, Endpoint};
use tonic::{Code, Status};

use crate::codec::{argmax, DEFAULT_INPUT_SHAPE, DEFAULT_SIGNATURE};
use crate::proto::{
    DataType, Dim, ModelSpec, PredictRequest, PredictResponse, PredictionServiceClient,
    TensorProto, TensorShapeProto,
};

/// Input tensor key of the `predict_images` signature
pub const INPUT_KEY: &str = "images";

/// Output tensor key holding the class scores
pub const OUTPUT_KEY: &str = "scores";

/// Largest response message accepted from the server
const MAX_DECODING_MESSAGE_SIZE: usize = 64 * 1024 * 1024;

// ============================================================================
// Codec
// ============================================================================

/// Request codec for `PredictionService.Predict`
#[derive(Debug, Clone)]
pub struct GrpcCodec {
    model_name: String,
    signature_name: String,
    input_shape: Vec<usize>,
}

impl GrpcCodec {
    /// Codec addressing `model_name` through the `predict_images` signature
    pub fn new(model_name: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            signature_name: DEFAULT_SIGNATURE.to_string(),
            input_shape: DEFAULT_INPUT_SHAPE.to_vec(),
        }
    }

    /// Override the per-example input shape
    pub fn with_input_shape(mut self, shape: Vec<usize>) -> Self {
        self.input_shape = shape;
        self
    }

    /// Model the requests are addressed to
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Build the `PredictRequest` for one example
    ///
    /// The input goes under `images` as a float tensor of shape
    /// `[1, ..input_shape]`.
    pub fn predict_request(&self, example: &Example) -> Result<PredictRequest, CodecError> {
        let mut batch_shape = Vec::with_capacity(self.input_shape.len() + 1);
        batch_shape.push(1);
        batch_shape.extend_from_slice(&self.input_shape);

        let (shape, data) = example.input.reshape(batch_shape)?.into_parts();
        let images = TensorProto {
            dtype: DataType::DtFloat as i32,
            tensor_shape: Some(TensorShapeProto {
                dim: shape
                    .iter()
                    .map(|&size| Dim {
                        size: size as i64,
                        name: String::new(),
                    })
                    .collect(),
                unknown_rank: false,
            }),
            float_val: data,
            ..Default::default()
        };

        Ok(PredictRequest {
            model_spec: Some(ModelSpec {
                name: self.model_name.clone(),
                signature_name: self.signature_name.clone(),
            }),
            inputs: HashMap::from([(INPUT_KEY.to_string(), images)]),
            output_filter: Vec::new(),
        })
    }
}

impl RequestCodec for GrpcCodec {
    fn name(&self) -> &str {
        "grpc"
    }

    fn encode(&self, example: &Example) -> Result<Vec<u8>, CodecError> {
        Ok(self.predict_request(example)?.encode_to_vec())
    }

    fn decode(&self, body: &[u8]) -> Result<usize, CodecError> {
        let response =
            PredictResponse::decode(body).map_err(|e| CodecError::Protobuf(e.to_string()))?;
        let scores = response
            .outputs
            .get(OUTPUT_KEY)
            .ok_or(CodecError::MissingField("scores"))?;

        argmax(&float_values(scores))
    }
}

/// Float contents of a tensor, from `float_val` or packed `tensor_content`
fn float_values(tensor: &TensorProto) -> Vec<f64> {
    if !tensor.float_val.is_empty() {
        return tensor.float_val.iter().map(|&v| f64::from(v)).collect();
    }
    tensor
        .tensor_content
        .chunks_exact(4)
        .map(|b| f64::from(f32::from_le_bytes([b[0], b[1], b[2], b[3]])))
        .collect()
}

// ============================================================================
// Transport
// ============================================================================

/// Calls `PredictionService.Predict` over one multiplexed HTTP/2 channel
///
/// Every call carries the configured timeout as its gRPC deadline. Cloning
/// is cheap; clones share the channel.
#[derive(Debug, Clone)]
pub struct GrpcTransport {
    client: PredictionServiceClient<Channel>,
    target: Arc<str>,
    timeout: Duration,
    runtime: Handle,
}

impl GrpcTransport {
    /// Create a transport for `target` (e.g. `http://127.0.0.1:8500`)
    ///
    /// The channel connects lazily on the first call, so an unreachable
    /// server shows up as failed requests rather than here.
    ///
    /// # Errors
    ///
    /// Returns an error if `target` is not a valid URI.
    pub fn new(
        target: impl Into<String>,
        timeout: Duration,
        runtime: Handle,
    ) -> Result<Self, tonic::transport::Error> {
        let target = target.into();
        let endpoint = Endpoint::from_shared(target.clone())?
            .connect_timeout(timeout)
            .tcp_nodelay(true);

        // The channel's background worker is spawned onto `runtime`
        let channel = {
            let _guard = runtime.enter();
            endpoint.connect_lazy()
        };
        let client =
            PredictionServiceClient::new(channel).max_decoding_message_size(MAX_DECODING_MESSAGE_SIZE);

        Ok(Self {
            client,
            target: Arc::from(target),
            timeout,
            runtime,
        })
    }

    /// Target URI
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Per-request deadline
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Send one serialized `PredictRequest` and return the serialized response
    pub async fn predict(&self, body: Vec<u8>) -> Result<Vec<u8>, TransportError> {
        call(self.client.clone(), self.timeout, body).await
    }
}

async fn call(
    mut client: PredictionServiceClient<Channel>,
    timeout: Duration,
    body: Vec<u8>,
) -> Result<Vec<u8>, TransportError> {
    let message =
        PredictRequest::decode(body.as_slice()).map_err(|e| TransportError::Encode(e.to_string()))?;

    let mut request = tonic::Request::new(message);
    request.set_timeout(timeout);

    let response = tokio::time::timeout(timeout, client.predict(request))
        .await
        .map_err(|_| TransportError::Timeout(timeout))?
        .map_err(|status| map_status(status, timeout))?;

    Ok(response.into_inner().encode_to_vec())
}

fn map_status(status: Status, timeout: Duration) -> TransportError {
    match status.code() {
        // Servers report an expired grpc-timeout as either code
        Code::DeadlineExceeded | Code::Cancelled => TransportError::Timeout(timeout),
        Code::Unavailable => TransportError::Connection(status.message().to_string()),
        code => TransportError::Rpc {
            code: format!("{:?}", code),
            message: status.message().to_string(),
        },
    }
}

impl Transport for GrpcTransport {
    fn name(&self) -> &str {
        "grpc"
    }

    /// Must not be called from inside an async context.
    fn send(&self, body: Vec<u8>) -> Result<Vec<u8>, TransportError> {
        self.runtime.block_on(self.predict(body))
    }
}

impl AsyncTransport for GrpcTransport {
    fn name(&self) -> &str {
        "grpc"
    }

    fn send_async(&self, body: Vec<u8>, on_done: CompletionCallback) {
        let client = self.client.clone();
        let timeout = self.timeout;

        self.runtime.spawn(async move {
            let result = call(client, timeout, body).await;
            on_done(result);
        });
    }
}

#[cfg(test)]
pub(crate) mod test_server {
    //! In-process tonic `PredictionService`

    use std::net::SocketAddr;
    use std::time::Duration;

    use tokio::runtime::Runtime;
    use tokio_stream::wrappers::TcpListenerStream;
    use tonic::{Request, Response, Status};

    use super::OUTPUT_KEY;
    use crate::proto::tensorflow::serving::prediction_service_server::{
        PredictionService, PredictionServiceServer,
    };
    use crate::proto::{DataType, PredictRequest, PredictResponse, TensorProto};

    type Respond = dyn Fn(PredictRequest) -> Result<PredictResponse, Status> + Send + Sync;

    struct FakeServing {
        respond: Box<Respond>,
        delay: Duration,
    }

    #[tonic::async_trait]
    impl PredictionService for FakeServing {
        async fn predict(
            &self,
            request: Request<PredictRequest>,
        ) -> Result<Response<PredictResponse>, Status> {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            (self.respond)(request.into_inner()).map(Response::new)
        }
    }

    /// Serve `respond` on an ephemeral port of `runtime`
    pub(crate) fn spawn<F>(runtime: &Runtime, respond: F) -> SocketAddr
    where
        F: Fn(PredictRequest) -> Result<PredictResponse, Status> + Send + Sync + 'static,
    {
        spawn_delayed(runtime, Duration::ZERO, respond)
    }

    /// Like [`spawn`], sleeping `delay` before every answer
    pub(crate) fn spawn_delayed<F>(runtime: &Runtime, delay: Duration, respond: F) -> SocketAddr
    where
        F: Fn(PredictRequest) -> Result<PredictResponse, Status> + Send + Sync + 'static,
    {
        let listener = runtime
            .block_on(tokio::net::TcpListener::bind("127.0.0.1:0"))
            .unwrap();
        let addr = listener.local_addr().unwrap();

        let service = PredictionServiceServer::new(FakeServing {
            respond: Box::new(respond),
            delay,
        });
        runtime.spawn(
            tonic::transport::Server::builder()
                .add_service(service)
                .serve_with_incoming(TcpListenerStream::new(listener)),
        );

        addr
    }

    /// Response carrying `scores` under the output key
    pub(crate) fn scores(scores: Vec<f32>) -> PredictResponse {
        let tensor = TensorProto {
            dtype: DataType::DtFloat as i32,
            float_val: scores,
            ..Default::default()
        };
        PredictResponse {
            model_spec: None,
            outputs: [(OUTPUT_KEY.to_string(), tensor)].into_iter().collect(),
        }
    }

    /// First value of the `images` input, or NaN when absent
    pub(crate) fn first_input(request: &PredictRequest) -> f32 {
        request
            .inputs
            .get(super::INPUT_KEY)
            .and_then(|t| t.float_val.first().copied())
            .unwrap_or(f32::NAN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inferbench_core::Tensor;
    use std::sync::mpsc;

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .unwrap()
    }

    fn example(label: usize) -> Example {
        let data = (0..4).map(|i| (label * 10 + i) as f32).collect();
        Example::new("img_0.JPEG", Tensor::new(vec![2, 2, 1], data).unwrap(), label)
    }

    fn codec() -> GrpcCodec {
        GrpcCodec::new("inception_v3").with_input_shape(vec![2, 2, 1])
    }

    /// One-hot scores at the label encoded in the first input value
    fn one_hot_server(rt: &tokio::runtime::Runtime) -> std::net::SocketAddr {
        test_server::spawn(rt, |request| {
            let label = (test_server::first_input(&request) / 10.0) as usize;
            let mut scores = vec![0.0; 8];
            scores[label] = 1.0;
            Ok(test_server::scores(scores))
        })
    }

    // =========================================================================
    // Codec tests
    // =========================================================================

    #[test]
    fn test_predict_request_layout() {
        let request = codec().predict_request(&example(2)).unwrap();

        let spec = request.model_spec.unwrap();
        assert_eq!(spec.name, "inception_v3");
        assert_eq!(spec.signature_name, "predict_images");

        let images = &request.inputs["images"];
        assert_eq!(images.dtype, DataType::DtFloat as i32);
        let dims: Vec<i64> = images
            .tensor_shape
            .as_ref()
            .unwrap()
            .dim
            .iter()
            .map(|d| d.size)
            .collect();
        assert_eq!(dims, vec![1, 2, 2, 1]);
        assert_eq!(images.float_val, vec![20.0, 21.0, 22.0, 23.0]);
    }

    #[test]
    fn test_default_shape_is_inception_input() {
        let codec = GrpcCodec::new("inception_v3");
        let input = Tensor::zeros(vec![299, 299, 3]);
        let request = codec.predict_request(&Example::new("x", input, 0)).unwrap();

        let dims: Vec<i64> = request.inputs["images"]
            .tensor_shape
            .as_ref()
            .unwrap()
            .dim
            .iter()
            .map(|d| d.size)
            .collect();
        assert_eq!(dims, vec![1, 299, 299, 3]);
    }

    #[test]
    fn test_encode_shape_mismatch() {
        let result = GrpcCodec::new("m").encode(&example(0));
        assert!(matches!(result, Err(CodecError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_decode_float_val_argmax() {
        let body = test_server::scores(vec![0.1, 0.3, 0.3, 0.2]).encode_to_vec();
        assert_eq!(codec().decode(&body).unwrap(), 1);
    }

    #[test]
    fn test_decode_tensor_content() {
        let content: Vec<u8> = [0.2f32, 0.1, 0.7]
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect();
        let response = PredictResponse {
            model_spec: None,
            outputs: HashMap::from([(
                OUTPUT_KEY.to_string(),
                TensorProto {
                    dtype: DataType::DtFloat as i32,
                    tensor_content: content,
                    ..Default::default()
                },
            )]),
        };
        assert_eq!(codec().decode(&response.encode_to_vec()).unwrap(), 2);
    }

    #[test]
    fn test_decode_errors() {
        let no_scores = PredictResponse::default().encode_to_vec();
        assert!(matches!(
            codec().decode(&no_scores),
            Err(CodecError::MissingField("scores"))
        ));

        let empty = test_server::scores(Vec::new()).encode_to_vec();
        assert!(matches!(codec().decode(&empty), Err(CodecError::EmptyScores)));

        assert!(matches!(
            codec().decode(&[0xff, 0xff, 0xff]),
            Err(CodecError::Protobuf(_))
        ));
    }

    // =========================================================================
    // Transport tests
    // =========================================================================

    #[test]
    fn test_blocking_predict_roundtrip() {
        let rt = runtime();
        let addr = one_hot_server(&rt);
        let t = GrpcTransport::new(format!("http://{}", addr), Duration::from_secs(5), rt.handle().clone())
            .unwrap();

        let codec = codec();
        let body = codec.encode(&example(5)).unwrap();
        let reply = Transport::send(&t, body).unwrap();
        assert_eq!(codec.decode(&reply).unwrap(), 5);
    }

    #[test]
    fn test_callback_predict() {
        let rt = runtime();
        let addr = one_hot_server(&rt);
        let t = GrpcTransport::new(format!("http://{}", addr), Duration::from_secs(5), rt.handle().clone())
            .unwrap();

        let codec = codec();
        let (tx, rx) = mpsc::channel();
        t.send_async(
            codec.encode(&example(3)).unwrap(),
            Box::new(move |result| {
                tx.send(result).unwrap();
            }),
        );

        let reply = rx.recv_timeout(Duration::from_secs(10)).unwrap().unwrap();
        assert_eq!(codec.decode(&reply).unwrap(), 3);
    }

    #[test]
    fn test_request_carries_model_spec() {
        let rt = runtime();
        let addr = test_server::spawn(&rt, |request| {
            match request.model_spec {
                Some(spec) if spec.name == "inception_v3" && spec.signature_name == "predict_images" => {
                    Ok(test_server::scores(vec![0.0, 1.0]))
                }
                _ => Err(Status::not_found("Servable not found")),
            }
        });
        let t = GrpcTransport::new(format!("http://{}", addr), Duration::from_secs(5), rt.handle().clone())
            .unwrap();

        let reply = Transport::send(&t, codec().encode(&example(0)).unwrap()).unwrap();
        assert_eq!(codec().decode(&reply).unwrap(), 1);

        let other = GrpcCodec::new("resnet").with_input_shape(vec![2, 2, 1]);
        let err = Transport::send(&t, other.encode(&example(0)).unwrap()).unwrap_err();
        match err {
            TransportError::Rpc { code, message } => {
                assert_eq!(code, "NotFound");
                assert_eq!(message, "Servable not found");
            }
            other => panic!("expected rpc error, got {:?}", other),
        }
    }

    #[test]
    fn test_deadline() {
        let rt = runtime();
        let addr = test_server::spawn_delayed(&rt, Duration::from_secs(3), |_| {
            Ok(test_server::scores(vec![1.0]))
        });
        let timeout = Duration::from_millis(200);
        let t = GrpcTransport::new(format!("http://{}", addr), timeout, rt.handle().clone()).unwrap();

        let (tx, rx) = mpsc::channel();
        t.send_async(
            codec().encode(&example(0)).unwrap(),
            Box::new(move |result| {
                tx.send(result).unwrap();
            }),
        );

        let result = rx.recv_timeout(Duration::from_secs(10)).unwrap();
        assert_eq!(result, Err(TransportError::Timeout(timeout)));
    }

    #[test]
    fn test_unreachable_server() {
        // Bind then drop to get a port nobody listens on
        let addr = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap();
        let rt = runtime();
        let t = GrpcTransport::new(format!("http://{}", addr), Duration::from_secs(2), rt.handle().clone())
            .unwrap();

        let err = Transport::send(&t, codec().encode(&example(0)).unwrap()).unwrap_err();
        assert!(
            matches!(
                err,
                TransportError::Connection(_) | TransportError::Rpc { .. } | TransportError::Timeout(_)
            ),
            "got {:?}",
            err
        );
    }

    #[test]
    fn test_garbage_body_is_encode_error() {
        let rt = runtime();
        let t = GrpcTransport::new("http://127.0.0.1:1", Duration::from_secs(1), rt.handle().clone())
            .unwrap();

        let err = Transport::send(&t, vec![0xff, 0xff, 0xff]).unwrap_err();
        assert!(matches!(err, TransportError::Encode(_)), "got {:?}", err);
        assert_eq!(t.target(), "http://127.0.0.1:1");
    }

    #[test]
    fn test_invalid_target() {
        let rt = runtime();
        assert!(GrpcTransport::new("not a uri", Duration::from_secs(1), rt.handle().clone()).is_err());
    }
}
