//! Turns a request code, identifier and attribute list into final wire bytes


use super::crypto::{ accounting_request_authenticator, generate_request_authenticator, message_authenticator, obscure_password };
use super::dictionary::{ MESSAGE_AUTHENTICATOR, USER_PASSWORD };
use super::error::RadiusError;
use super::radius_packet::{ attribute_value_offset, Authenticator, RadiusAttribute, RadiusPacket, TypeCode, AUTHENTICATOR_LENGTH };

use log::debug;


#[derive(Debug, Clone, PartialEq, Eq)]
/// Request, ready to be handed to transport
pub struct WirePacket {
    bytes:         Vec<u8>,
    authenticator: Authenticator
}

impl WirePacket {
    /// Returns packet bytes
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the authenticator carried in the header; replies are verified against it
    pub fn authenticator(&self) -> &Authenticator {
        &self.authenticator
    }

    /// Returns packet identifier
    pub fn id(&self) -> u8 {
        self.bytes[1]
    }

    /// Consumes packet, returning its bytes
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}


#[derive(Debug)]
/// Builds Access-Request and Accounting-Request packets
///
/// User-Password values are given in plain text and get obscured while building; any
/// Message-Authenticator in the attribute list is dropped and, when enabled, recomputed
pub struct RequestBuilder<'a> {
    code:                  TypeCode,
    id:                    u8,
    authenticator:         Authenticator,
    attributes:            &'a [RadiusAttribute],
    message_authenticator: bool
}

impl<'a> RequestBuilder<'a> {
    /// Initialises builder with a fresh Request Authenticator and no Message-Authenticator
    pub fn new(code: TypeCode, id: u8, attributes: &'a [RadiusAttribute]) -> RequestBuilder<'a> {
        RequestBuilder {
            code,
            id,
            authenticator:         generate_request_authenticator(),
            attributes,
            message_authenticator: false
        }
    }

    /// **Optional**
    ///
    /// Sets Request Authenticator of Access-Request; ignored for Accounting-Request, whose
    /// authenticator is always computed
    pub fn set_authenticator(mut self, authenticator: Authenticator) -> RequestBuilder<'a> {
        self.authenticator = authenticator;
        self
    }

    /// **Optional**
    ///
    /// Appends Message-Authenticator to Access-Request
    pub fn set_message_authenticator(mut self, enabled: bool) -> RequestBuilder<'a> {
        self.message_authenticator = enabled;
        self
    }

    /// Produces final bytes of the request, signed/obscured with `secret`
    pub fn build(&self, secret: &[u8]) -> Result<WirePacket, RadiusError> {
        match self.code {
            TypeCode::AccessRequest     => self.build_access_request(secret),
            TypeCode::AccountingRequest => self.build_accounting_request(secret),
            _                           => Err( RadiusError::MalformedPacketError { error: format!("{:?} is not a request a client can send", self.code) } )
        }
    }

    fn build_access_request(&self, secret: &[u8]) -> Result<WirePacket, RadiusError> {
        let mut attributes = Vec::with_capacity(self.attributes.len() + 1);

        for attr in self.attributes.iter().filter(|attr| attr.id() != MESSAGE_AUTHENTICATOR) {
            if attr.id() == USER_PASSWORD {
                attributes.push(RadiusAttribute::new(USER_PASSWORD, obscure_password(attr.value(), secret, &self.authenticator)?)?);
            } else {
                attributes.push(attr.clone());
            }
        }
        if self.message_authenticator {
            attributes.push(RadiusAttribute::new(MESSAGE_AUTHENTICATOR, vec![0; AUTHENTICATOR_LENGTH])?);
        }

        let mut packet = RadiusPacket::initialise_packet(self.code, self.id, self.authenticator);
        packet.set_attributes(attributes);
        let mut bytes = packet.to_bytes()?;

        if self.message_authenticator {
            let offset = attribute_value_offset(&bytes, MESSAGE_AUTHENTICATOR).ok_or_else(|| RadiusError::MalformedPacketError { error: String::from("Message-Authenticator attribute not found in packet") })?;
            let hash   = message_authenticator(&bytes, secret)?;
            bytes[offset..offset + AUTHENTICATOR_LENGTH].copy_from_slice(&hash);
        }

        debug!("Built Access-Request {} ({} bytes)", self.id, bytes.len());
        Ok(WirePacket { bytes, authenticator: self.authenticator })
    }

    fn build_accounting_request(&self, secret: &[u8]) -> Result<WirePacket, RadiusError> {
        if self.attributes.iter().any(|attr| attr.id() == USER_PASSWORD) {
            return Err( RadiusError::MalformedPacketError { error: String::from("User-Password is not allowed in Accounting-Request") } )
        }

        let mut packet = RadiusPacket::initialise_packet(self.code, self.id, [0; AUTHENTICATOR_LENGTH]);
        packet.set_attributes(self.attributes.iter().filter(|attr| attr.id() != MESSAGE_AUTHENTICATOR).cloned().collect());
        let mut bytes = packet.to_bytes()?;

        let authenticator = accounting_request_authenticator(&bytes, secret);
        bytes[4..4 + AUTHENTICATOR_LENGTH].copy_from_slice(&authenticator);

        debug!("Built Accounting-Request {} ({} bytes)", self.id, bytes.len());
        Ok(WirePacket { bytes, authenticator })
    }
}
