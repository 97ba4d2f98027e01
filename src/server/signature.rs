use axum::http::HeaderValue;
use hmac_sha256::HMAC;
use subtle::ConstantTimeEq;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub(crate) enum SignatureError {
    #[error("missing signature")]
    Missing,
    #[error("malformed signature")]
    Malformed,
    #[error("signature mismatch")]
    Mismatch,
}

pub(crate) fn verify(
    secret: &[u8],
    header: Option<&HeaderValue>,
    body: &[u8],
) -> Result<(), SignatureError> {
    let header = header.ok_or(SignatureError::Missing)?;
    let digest = header
        .to_str()
        .ok()
        .and_then(|value| value.strip_prefix("sha256="))
        .ok_or(SignatureError::Malformed)?;
    let received = hex::decode(digest).map_err(|_| SignatureError::Malformed)?;
    let expected = HMAC::mac(body, secret);
    if bool::from(expected.as_slice().ct_eq(&received)) {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}
