//! Content decoding for relayed upstream bodies.
//!
//! The upstream client leaves bodies compressed so the record keeps the headers
//! the upstream actually sent. Decoding happens here instead, undoing each coding
//! listed in `Content-Encoding` from the last applied to the first.

use std::io;

use async_compression::tokio::bufread::{BrotliDecoder, DeflateDecoder, GzipDecoder, ZlibDecoder};
use hyper::body::Bytes;
use hyper::header::CONTENT_ENCODING;
use hyper::HeaderMap;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Value sent upstream when the client did not state its own `Accept-Encoding`.
pub const ACCEPTED_ENCODINGS: &str = "gzip, deflate, br";

/// A body that claims a coding but does not decode.
#[derive(Debug, thiserror::Error)]
#[error("could not decode {encoding} body: {source}")]
pub struct DecodeError {
    pub encoding: String,
    #[source]
    pub source: io::Error,
}

/// Undo the content codings named in `headers`.
///
/// Unknown codings stop decoding and the body is returned as it stands.
pub async fn decode_body(headers: &HeaderMap, body: Bytes) -> Result<Bytes, DecodeError> {
    if body.is_empty() {
        return Ok(body);
    }

    let mut body = body;
    for coding in content_codings(headers).iter().rev() {
        let decoded = decode_one(coding, &body).await;
        match decoded {
            Ok(Some(decoded)) => body = decoded,
            Ok(None) => {
                tracing::warn!(encoding = %coding, "Unknown content coding; relaying body undecoded");
                return Ok(body);
            }
            Err(source) => {
                return Err(DecodeError {
                    encoding: coding.clone(),
                    source,
                })
            }
        }
    }
    Ok(body)
}

fn content_codings(headers: &HeaderMap) -> Vec<String> {
    headers
        .get_all(CONTENT_ENCODING)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(|coding| coding.trim().to_ascii_lowercase())
        .filter(|coding| !coding.is_empty() && coding != "identity")
        .collect()
}

async fn decode_one(coding: &str, body: &[u8]) -> io::Result<Option<Bytes>> {
    let decoded = match coding {
        "gzip" | "x-gzip" => read_all(GzipDecoder::new(body)).await?,
        "br" => read_all(BrotliDecoder::new(body)).await?,
        "deflate" => match read_all(ZlibDecoder::new(body)).await {
            Ok(decoded) => decoded,
            // Some servers send raw deflate without the zlib wrapper.
            Err(_) => read_all(DeflateDecoder::new(body)).await?,
        },
        _ => return Ok(None),
    };
    Ok(Some(Bytes::from(decoded)))
}

async fn read_all<R: AsyncRead + Unpin>(mut reader: R) -> io::Result<Vec<u8>> {
    let mut out = Vec::new();
    reader.read_to_end(&mut out).await?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_compression::tokio::bufread::{BrotliEncoder, DeflateEncoder, GzipEncoder};
    use hyper::header::HeaderValue;

    const TEXT: &[u8] = b"hello from upstream";

    fn encoded_as(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_ENCODING, HeaderValue::from_static(value));
        headers
    }

    async fn gzip(data: &[u8]) -> Bytes {
        Bytes::from(read_all(GzipEncoder::new(data)).await.unwrap())
    }

    #[tokio::test]
    async fn decodes_gzip() {
        let body = gzip(TEXT).await;
        let decoded = decode_body(&encoded_as("gzip"), body).await.unwrap();
        assert_eq!(decoded, TEXT);
    }

    #[tokio::test]
    async fn decodes_raw_deflate() {
        let body = Bytes::from(read_all(DeflateEncoder::new(TEXT)).await.unwrap());
        let decoded = decode_body(&encoded_as("deflate"), body).await.unwrap();
        assert_eq!(decoded, TEXT);
    }

    #[tokio::test]
    async fn undoes_stacked_codings_in_reverse() {
        let gzipped = gzip(TEXT).await;
        let body = Bytes::from(read_all(BrotliEncoder::new(&gzipped[..])).await.unwrap());

        let decoded = decode_body(&encoded_as("gzip, br"), body).await.unwrap();
        assert_eq!(decoded, TEXT);
    }

    #[tokio::test]
    async fn identity_and_unknown_codings_pass_through() {
        let body = Bytes::from_static(TEXT);
        assert_eq!(decode_body(&encoded_as("identity"), body.clone()).await.unwrap(), TEXT);
        assert_eq!(decode_body(&encoded_as("zstd"), body).await.unwrap(), TEXT);
    }

    #[tokio::test]
    async fn corrupt_gzip_is_an_error() {
        let err = decode_body(&encoded_as("gzip"), Bytes::from_static(b"not gzip"))
            .await
            .unwrap_err();
        assert_eq!(err.encoding, "gzip");
    }

    #[tokio::test]
    async fn empty_body_is_left_alone() {
        let decoded = decode_body(&encoded_as("gzip"), Bytes::new()).await.unwrap();
        assert!(decoded.is_empty());
    }
}
