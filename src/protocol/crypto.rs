//! Authenticator and User-Password hashing (RFC 2865 section 3 & 5.2, RFC 2866 section 3,
//! RFC 3579 section 3.2)
//!
//! All functions take the shared secret as raw bytes; it is never part of any packet


use super::error::RadiusError;
use super::radius_packet::{ Authenticator, AUTHENTICATOR_LENGTH, RADIUS_HEADER_LENGTH };

use hmac::{ Hmac, Mac };
use md5::{ Digest, Md5 };
use rand::Rng;


type HmacMd5 = Hmac<Md5>;

/// Longest User-Password RFC 2865 allows
pub const MAX_PASSWORD_LENGTH: usize = 128;


/// Generates unpredictable Request Authenticator for Access-Request
pub fn generate_request_authenticator() -> Authenticator {
    let mut authenticator = [0u8; AUTHENTICATOR_LENGTH];
    rand::thread_rng().fill(&mut authenticator);
    authenticator
}

fn md5_of(parts: &[&[u8]]) -> Authenticator {
    let mut md5_hasher = Md5::new();
    for part in parts {
        md5_hasher.update(part);
    }

    let mut hash = [0u8; AUTHENTICATOR_LENGTH];
    hash.copy_from_slice(&md5_hasher.finalize());
    hash
}

/// Compares two digests without stopping at the first differing byte
pub fn digests_match(left: &[u8], right: &[u8]) -> bool {
    left.len() == right.len() && left.iter().zip(right.iter()).fold(0u8, |diff, (l, r)| diff | (l ^ r)) == 0
}

/// Obscures User-Password value
///
/// Password is padded with zeros to a multiple of 16 bytes (an empty one becomes a single block),
/// every block is XORed with MD5(secret + previous block), the first previous block being the
/// Request Authenticator
pub fn obscure_password(password: &[u8], secret: &[u8], authenticator: &Authenticator) -> Result<Vec<u8>, RadiusError> {
    if password.len() > MAX_PASSWORD_LENGTH {
        return Err( RadiusError::MalformedAttributeError { error: format!("User-Password is {} bytes long, limit is {}", password.len(), MAX_PASSWORD_LENGTH) } )
    }

    let blocks     = std::cmp::max(1, (password.len() + AUTHENTICATOR_LENGTH - 1) / AUTHENTICATOR_LENGTH);
    let mut output = password.to_vec();
    output.resize(blocks * AUTHENTICATOR_LENGTH, 0);

    let mut previous = *authenticator;
    for block in output.chunks_mut(AUTHENTICATOR_LENGTH) {
        let hash = md5_of(&[secret, &previous]);
        for (byte, key) in block.iter_mut().zip(hash.iter()) {
            *byte ^= key;
        }
        previous.copy_from_slice(block);
    }

    Ok(output)
}

/// Recovers zero padded User-Password from its obscured form
pub fn recover_password(obscured: &[u8], secret: &[u8], authenticator: &Authenticator) -> Result<Vec<u8>, RadiusError> {
    if obscured.is_empty() || obscured.len() % AUTHENTICATOR_LENGTH != 0 || obscured.len() > MAX_PASSWORD_LENGTH {
        return Err( RadiusError::MalformedAttributeError { error: format!("obscured User-Password cannot be {} bytes long", obscured.len()) } )
    }

    let mut output   = Vec::with_capacity(obscured.len());
    let mut previous = authenticator.to_vec();
    for block in obscured.chunks(AUTHENTICATOR_LENGTH) {
        let hash = md5_of(&[secret, &previous]);
        output.extend(block.iter().zip(hash.iter()).map(|(byte, key)| byte ^ key));
        previous = block.to_vec();
    }

    Ok(output)
}

/// Computes Accounting-Request authenticator
///
/// `packet` is the complete request; whatever its authenticator field holds is treated as 16 zero
/// bytes
pub fn accounting_request_authenticator(packet: &[u8], secret: &[u8]) -> Authenticator {
    md5_of(&[&packet[0..4], &[0u8; AUTHENTICATOR_LENGTH], &packet[RADIUS_HEADER_LENGTH..], secret])
}

/// Computes Response Authenticator of a reply to the request that carried `request_authenticator`
///
/// `reply` is the reply cut to its declared length; its own authenticator field is not hashed
pub fn response_authenticator(reply: &[u8], request_authenticator: &Authenticator, secret: &[u8]) -> Authenticator {
    md5_of(&[&reply[0..4], request_authenticator, &reply[RADIUS_HEADER_LENGTH..], secret])
}

/// Computes HMAC-MD5 for Message-Authenticator attribute
///
/// Note: `packet` must already carry 16 zero bytes as Message-Authenticator value and the
/// authenticator the receiving side verifies against
pub fn message_authenticator(packet: &[u8], secret: &[u8]) -> Result<Authenticator, RadiusError> {
    let mut hash = HmacMd5::new_from_slice(secret).map_err(|error| RadiusError::ValidationError { error: error.to_string() })?;
    hash.update(packet);

    let mut output = [0u8; AUTHENTICATOR_LENGTH];
    output.copy_from_slice(&hash.finalize().into_bytes());
    Ok(output)
}
