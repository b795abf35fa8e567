//! Verification of replies against the request they claim to answer


use super::crypto::{ digests_match, message_authenticator, response_authenticator };
use super::dictionary::MESSAGE_AUTHENTICATOR;
use super::error::RadiusError;
use super::radius_packet::{ attribute_value_offset, Authenticator, RadiusPacket, TypeCode, AUTHENTICATOR_LENGTH };

use log::debug;


/// Verifies that reply answers the request with given code, id and authenticator
///
/// Checks, in order: packet structure, identifier, Response Authenticator, reply code and, when
/// present, Message-Authenticator. Returns the decoded reply only if all of them hold
pub fn verify_reply(request_code: &TypeCode, request_id: u8, request_authenticator: &Authenticator, secret: &[u8], reply: &[u8]) -> Result<RadiusPacket, RadiusError> {
    let reply  = RadiusPacket::declared_bytes(reply)?;
    let packet = RadiusPacket::initialise_packet_from_bytes(reply)?;

    if packet.id() != request_id {
        return Err( RadiusError::AuthenticationFailure { error: String::from("Packet identifier mismatch") } )
    }

    let hash = response_authenticator(reply, request_authenticator, secret);
    if !digests_match(&hash, &reply[4..20]) {
        debug!("Reply {} carries authenticator {:02x?}, expected {:02x?}", request_id, &reply[4..20], hash);
        return Err( RadiusError::AuthenticationFailure { error: String::from("Packet authenticator mismatch") } )
    }

    if !packet.code().answers(request_code) {
        return Err( RadiusError::ValidationError { error: format!("{:?} is not a valid reply to {:?}", packet.code(), request_code) } )
    }

    if let Some(offset) = attribute_value_offset(reply, MESSAGE_AUTHENTICATOR) {
        verify_message_authenticator(reply, offset, request_authenticator, secret)?;
    }

    Ok(packet)
}

/// Verifies Message-Authenticator value located at `offset` of `reply`
fn verify_message_authenticator(reply: &[u8], offset: usize, request_authenticator: &Authenticator, secret: &[u8]) -> Result<(), RadiusError> {
    if reply[offset - 1] as usize != 2 + AUTHENTICATOR_LENGTH {
        return Err( RadiusError::AuthenticationFailure { error: String::from("Message-Authenticator has invalid length") } )
    }

    // Step 1. Take Message-Authenticator from reply
    let original_msg_auth = reply[offset..offset + AUTHENTICATOR_LENGTH].to_vec();

    // Step 2. Put request authenticator into header and zero Message-Authenticator
    let mut zeroed = reply.to_vec();
    zeroed[4..4 + AUTHENTICATOR_LENGTH].copy_from_slice(request_authenticator);
    zeroed[offset..offset + AUTHENTICATOR_LENGTH].copy_from_slice(&[0; AUTHENTICATOR_LENGTH]);

    // Step 3. Calculate HMAC-MD5 and compare with the one taken in Step 1
    let calculated_msg_auth = message_authenticator(&zeroed, secret)?;

    if digests_match(&calculated_msg_auth, &original_msg_auth) {
        Ok(())
    } else {
        Err( RadiusError::AuthenticationFailure { error: String::from("Packet Message-Authenticator mismatch") } )
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::dictionary::REPLY_MESSAGE;
    use crate::protocol::radius_packet::RadiusAttribute;

    const SECRET:        &[u8]         = b"testing123";
    const REQUEST_AUTH:  Authenticator = [3u8; 16];

    fn signed_reply(code: TypeCode, id: u8, attributes: Vec<RadiusAttribute>, secret: &[u8]) -> Vec<u8> {
        let mut reply = RadiusPacket::initialise_packet(code, id, [0; 16]);
        reply.set_attributes(attributes);

        let mut bytes = reply.to_bytes().unwrap();
        let hash      = response_authenticator(&bytes, &REQUEST_AUTH, secret);
        bytes[4..20].copy_from_slice(&hash);
        bytes
    }

    fn signed_reply_with_message_authenticator(secret: &[u8]) -> Vec<u8> {
        let attributes = vec![
            RadiusAttribute::from_string(REPLY_MESSAGE, "welcome").unwrap(),
            RadiusAttribute::new(MESSAGE_AUTHENTICATOR, vec![0; 16]).unwrap()
        ];
        let mut reply = RadiusPacket::initialise_packet(TypeCode::AccessAccept, 5, REQUEST_AUTH);
        reply.set_attributes(attributes);

        let mut bytes = reply.to_bytes().unwrap();
        let offset    = attribute_value_offset(&bytes, MESSAGE_AUTHENTICATOR).unwrap();
        let msg_auth  = message_authenticator(&bytes, secret).unwrap();
        bytes[offset..offset + 16].copy_from_slice(&msg_auth);

        let hash = response_authenticator(&bytes, &REQUEST_AUTH, secret);
        bytes[4..20].copy_from_slice(&hash);
        bytes
    }

    #[test]
    fn test_verify_reply_valid() {
        let reply  = signed_reply(TypeCode::AccessAccept, 5, vec![RadiusAttribute::from_string(REPLY_MESSAGE, "welcome").unwrap()], SECRET);
        let packet = verify_reply(&TypeCode::AccessRequest, 5, &REQUEST_AUTH, SECRET, &reply).unwrap();

        assert_eq!(&TypeCode::AccessAccept, packet.code());
        assert_eq!(b"welcome",              packet.attribute(REPLY_MESSAGE).unwrap().value());
    }

    #[test]
    fn test_verify_reply_wrong_secret() {
        let reply = signed_reply(TypeCode::AccessAccept, 5, Vec::new(), b"another-secret");

        match verify_reply(&TypeCode::AccessRequest, 5, &REQUEST_AUTH, SECRET, &reply) {
            Err(RadiusError::AuthenticationFailure { error }) => assert_eq!("Packet authenticator mismatch", error),
            other                                             => panic!("unexpected result: {:?}", other)
        }
    }

    #[test]
    fn test_verify_reply_identifier_mismatch() {
        let reply = signed_reply(TypeCode::AccessAccept, 6, Vec::new(), SECRET);

        match verify_reply(&TypeCode::AccessRequest, 5, &REQUEST_AUTH, SECRET, &reply) {
            Err(RadiusError::AuthenticationFailure { error }) => assert_eq!("Packet identifier mismatch", error),
            other                                             => panic!("unexpected result: {:?}", other)
        }
    }

    #[test]
    fn test_verify_reply_wrong_code_for_request() {
        let reply = signed_reply(TypeCode::AccountingResponse, 5, Vec::new(), SECRET);

        match verify_reply(&TypeCode::AccessRequest, 5, &REQUEST_AUTH, SECRET, &reply) {
            Err(RadiusError::ValidationError { .. }) => {},
            other                                    => panic!("unexpected result: {:?}", other)
        }
        assert!(verify_reply(&TypeCode::AccountingRequest, 5, &REQUEST_AUTH, SECRET, &reply).is_ok());
    }

    #[test]
    fn test_verify_reply_malformed() {
        let mut reply = signed_reply(TypeCode::AccessAccept, 5, vec![RadiusAttribute::from_string(REPLY_MESSAGE, "welcome").unwrap()], SECRET);
        reply[21] = 40;

        match verify_reply(&TypeCode::AccessRequest, 5, &REQUEST_AUTH, SECRET, &reply) {
            Err(RadiusError::MalformedPacketError { .. }) => {},
            other                                         => panic!("unexpected result: {:?}", other)
        }
    }

    #[test]
    fn test_verify_reply_message_authenticator() {
        let reply = signed_reply_with_message_authenticator(SECRET);
        assert!(verify_reply(&TypeCode::AccessRequest, 5, &REQUEST_AUTH, SECRET, &reply).is_ok());
    }

    #[test]
    fn test_verify_reply_message_authenticator_tampered() {
        let mut reply = signed_reply_with_message_authenticator(SECRET);
        let offset    = attribute_value_offset(&reply, MESSAGE_AUTHENTICATOR).unwrap();
        reply[offset] ^= 0xff;

        // Response Authenticator has to stay valid to reach Message-Authenticator check
        let hash = response_authenticator(&reply, &REQUEST_AUTH, SECRET);
        reply[4..20].copy_from_slice(&hash);

        match verify_reply(&TypeCode::AccessRequest, 5, &REQUEST_AUTH, SECRET, &reply) {
            Err(RadiusError::AuthenticationFailure { error }) => assert_eq!("Packet Message-Authenticator mismatch", error),
            other                                             => panic!("unexpected result: {:?}", other)
        }
    }
}
