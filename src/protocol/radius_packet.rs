//! RADIUS Packet & Attribute implementation


use super::dictionary::{ Dictionary, SupportedAttributeTypes };
use super::error::RadiusError;
use crate::tools::{ bytes_to_integer, bytes_to_timestamp, bytes_to_ipv4_string, bytes_to_ipv6_string, integer_to_bytes };

use std::convert::TryInto;
use std::fmt;
use std::net::{ Ipv4Addr, Ipv6Addr };


/// Code, identifier, length and authenticator
pub const RADIUS_HEADER_LENGTH:       usize = 20;
/// Length of Request/Response Authenticator
pub const AUTHENTICATOR_LENGTH:       usize = 16;
/// Largest packet RFC 2865 allows on the wire
pub const MAX_PACKET_LENGTH:          usize = 4096;
/// Largest value an attribute can carry (255 minus type and length octets)
pub const MAX_ATTRIBUTE_VALUE_LENGTH: usize = 253;

/// Request/Response Authenticator
pub type Authenticator = [u8; AUTHENTICATOR_LENGTH];


#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Allowed types of RADIUS messages/packets
pub enum TypeCode {
    /// AccessRequest      = 1
    AccessRequest,
    /// AccessAccept       = 2
    AccessAccept,
    /// AccessReject       = 3
    AccessReject,
    /// AccountingRequest  = 4
    AccountingRequest,
    /// AccountingResponse = 5
    AccountingResponse,
    /// AccessChallenge    = 11
    AccessChallenge
}

impl TypeCode {
    /// Convert integer(u8) value into corresponding TypeCode enum
    pub fn from_u8(code: u8) -> Result<TypeCode, RadiusError> {
        match code {
            1u8  => Ok(TypeCode::AccessRequest),
            2u8  => Ok(TypeCode::AccessAccept),
            3u8  => Ok(TypeCode::AccessReject),
            4u8  => Ok(TypeCode::AccountingRequest),
            5u8  => Ok(TypeCode::AccountingResponse),
            11u8 => Ok(TypeCode::AccessChallenge),
            _    => Err( RadiusError::MalformedPacketError { error: format!("Unknown RADIUS code: {}", code) } ),
        }
    }

    /// Convert TypeCode enum value into corresponding integer(u8)
    pub fn to_u8(&self) -> u8 {
        match self {
            TypeCode::AccessRequest      => 1u8,
            TypeCode::AccessAccept       => 2u8,
            TypeCode::AccessReject       => 3u8,
            TypeCode::AccountingRequest  => 4u8,
            TypeCode::AccountingResponse => 5u8,
            TypeCode::AccessChallenge    => 11u8
        }
    }

    /// Whether a client may send a packet with this code
    pub fn is_request(&self) -> bool {
        matches!(self, TypeCode::AccessRequest | TypeCode::AccountingRequest)
    }

    /// Whether a packet with this code is a valid terminal reply to `request`
    pub fn answers(&self, request: &TypeCode) -> bool {
        match request {
            TypeCode::AccessRequest     => matches!(self, TypeCode::AccessAccept | TypeCode::AccessReject | TypeCode::AccessChallenge),
            TypeCode::AccountingRequest => matches!(self, TypeCode::AccountingResponse),
            _                           => false
        }
    }

    /// Returns the kind of service (and therefore server port) a request is sent to
    pub fn msg_type(&self) -> RadiusMsgType {
        match self {
            TypeCode::AccountingRequest | TypeCode::AccountingResponse => RadiusMsgType::ACCT,
            _                                                          => RadiusMsgType::AUTH
        }
    }
}


#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Represents allowed types of RADIUS messages
pub enum RadiusMsgType {
    /// Authentication packet
    AUTH,
    /// Accounting packet
    ACCT
}

impl fmt::Display for RadiusMsgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            RadiusMsgType::AUTH => f.write_str("Auth"),
            RadiusMsgType::ACCT => f.write_str("Acct"),
        }
    }
}


#[derive(Debug, Clone, PartialEq, Eq)]
/// Represents an attribute, which would be sent to RADIUS Server/client as a part of RadiusPacket
pub struct RadiusAttribute {
    id:    u8,
    value: Vec<u8>
}

impl RadiusAttribute {
    /// Creates RadiusAttribute with given code; value must fit into a single attribute
    pub fn new(id: u8, value: Vec<u8>) -> Result<RadiusAttribute, RadiusError> {
        if value.len() > MAX_ATTRIBUTE_VALUE_LENGTH {
            return Err( RadiusError::MalformedAttributeError { error: format!("value of attribute {} is {} bytes long, limit is {}", id, value.len(), MAX_ATTRIBUTE_VALUE_LENGTH) } )
        }
        Ok(RadiusAttribute { id, value })
    }

    /// Creates RadiusAttribute with given name (name is checked against Dictionary)
    pub fn create_by_name(dictionary: &Dictionary, attribute_name: &str, value: Vec<u8>) -> Result<RadiusAttribute, RadiusError> {
        let attr = dictionary.attribute_by_name(attribute_name).ok_or_else(|| RadiusError::MalformedAttributeError { error: format!("Failed to create: {:?} attribute. Attribute is not known to dictionary", attribute_name) })?;
        RadiusAttribute::new(attr.code(), value)
    }

    /// Creates RadiusAttribute with given id (id is checked against Dictionary)
    pub fn create_by_id(dictionary: &Dictionary, attribute_code: u8, value: Vec<u8>) -> Result<RadiusAttribute, RadiusError> {
        let attr = dictionary.attribute_by_id(attribute_code).ok_or_else(|| RadiusError::MalformedAttributeError { error: format!("Failed to create: attribute with ID {}. Attribute is not known to dictionary", attribute_code) })?;
        RadiusAttribute::new(attr.code(), value)
    }

    /// Creates integer valued attribute (4 bytes, network byte order)
    pub fn from_integer(id: u8, value: u32) -> RadiusAttribute {
        RadiusAttribute { id, value: integer_to_bytes(value) }
    }

    /// Creates ipaddr valued attribute
    pub fn from_ipv4(id: u8, value: Ipv4Addr) -> RadiusAttribute {
        RadiusAttribute { id, value: value.octets().to_vec() }
    }

    /// Creates ipv6addr valued attribute
    pub fn from_ipv6(id: u8, value: Ipv6Addr) -> RadiusAttribute {
        RadiusAttribute { id, value: value.octets().to_vec() }
    }

    /// Creates string valued attribute; bytes are copied as is
    pub fn from_string(id: u8, value: &str) -> Result<RadiusAttribute, RadiusError> {
        RadiusAttribute::new(id, value.as_bytes().to_vec())
    }

    /// Returns RadiusAttribute id
    pub fn id(&self) -> u8 {
        self.id
    }

    /// Returns RadiusAttribute value
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// Returns RadiusAttribute name, if attribute is known to the dictionary
    pub fn name(&self, dictionary: &Dictionary) -> Option<&'static str> {
        dictionary.attribute_by_id(self.id).map(|attr| attr.name())
    }

    /// Gets the original value as a String
    ///
    /// If the RadiusAttribute respresents dictionary attribute of type: string, ipaddr, ipv6addr or ipv6prefix
    pub fn original_string_value(&self, allowed_type: SupportedAttributeTypes) -> Result<String, RadiusError> {
        match allowed_type {
            SupportedAttributeTypes::AsciiString => String::from_utf8(self.value.clone()).map_err(|_| RadiusError::MalformedAttributeError { error: String::from("invalid ASCII bytes") }),
            SupportedAttributeTypes::IPv4Addr    => bytes_to_ipv4_string(&self.value),
            SupportedAttributeTypes::IPv6Addr    => bytes_to_ipv6_string(&self.value),
            SupportedAttributeTypes::IPv6Prefix  => bytes_to_ipv6_string(&self.value),
            _                                    => Err( RadiusError::MalformedAttributeError { error: String::from("not a String data type") } )
        }
    }

    /// Gets the original value as an Integer
    ///
    /// If the RadiusAttribute respresents dictionary attribute of type: integer or date
    pub fn original_integer_value(&self, allowed_type: SupportedAttributeTypes) -> Result<u32, RadiusError> {
        let bytes: &[u8; 4] = self.value.as_slice().try_into().map_err(|_| RadiusError::MalformedAttributeError { error: String::from("invalid Integer bytes") })?;

        match allowed_type {
            SupportedAttributeTypes::Integer => Ok(bytes_to_integer(bytes)),
            SupportedAttributeTypes::Date    => Ok(bytes_to_timestamp(bytes)),
            _                                => Err( RadiusError::MalformedAttributeError { error: String::from("not an Integer data type") } )
        }
    }

    fn write_to(&self, buffer: &mut Vec<u8>) {
        /*
         *         0               1              2
            0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0
           +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-
           |     Type      |    Length     |  Value ...
           +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-
        *  Taken from https://tools.ietf.org/html/rfc2865#page-23
        */
        buffer.push(self.id);
        buffer.push((2 + self.value.len()) as u8);
        buffer.extend_from_slice(&self.value);
    }
}

/// Encodes attributes into their wire representation, preserving order
pub fn encode_attributes(attributes: &[RadiusAttribute]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(attributes.iter().map(|attr| 2 + attr.value.len()).sum());
    for attr in attributes {
        attr.write_to(&mut bytes);
    }
    bytes
}

/// Decodes attributes from their wire representation
///
/// Fails for the whole buffer if any attribute declares a length below 2 or runs past the end of
/// the buffer
pub fn decode_attributes(bytes: &[u8]) -> Result<Vec<RadiusAttribute>, RadiusError> {
    let mut attributes = Vec::new();
    let mut last_index = 0;

    while last_index < bytes.len() {
        if last_index + 2 > bytes.len() {
            return Err( RadiusError::MalformedPacketError { error: format!("truncated attribute header at offset {}", last_index) } )
        }
        let attr_id     = bytes[last_index];
        let attr_length = bytes[last_index + 1] as usize;

        if attr_length < 2 {
            return Err( RadiusError::MalformedPacketError { error: format!("attribute {} declares length {}", attr_id, attr_length) } )
        }
        if last_index + attr_length > bytes.len() {
            return Err( RadiusError::MalformedPacketError { error: format!("attribute {} overruns packet by {} bytes", attr_id, last_index + attr_length - bytes.len()) } )
        }

        attributes.push(RadiusAttribute {
            id:    attr_id,
            value: bytes[(last_index + 2)..(last_index + attr_length)].to_vec()
        });
        last_index += attr_length;
    }

    Ok(attributes)
}

/// Returns offset of the first value of attribute `attr_id` inside whole packet bytes
///
/// Expects a packet whose attributes were already validated by [`decode_attributes`]
pub(crate) fn attribute_value_offset(packet: &[u8], attr_id: u8) -> Option<usize> {
    let mut last_index = RADIUS_HEADER_LENGTH;

    while last_index + 2 <= packet.len() {
        let attr_length = packet[last_index + 1] as usize;
        if attr_length < 2 {
            return None
        }
        if packet[last_index] == attr_id {
            return Some(last_index + 2)
        }
        last_index += attr_length;
    }
    None
}


#[derive(Debug, Clone, PartialEq, Eq)]
/// Represents RADIUS packet
pub struct RadiusPacket {
    id:            u8,
    code:          TypeCode,
    authenticator: Authenticator,
    attributes:    Vec<RadiusAttribute>
}

impl RadiusPacket {
    /// Initialises RADIUS packet with given code, identifier and authenticator, and no attributes
    pub fn initialise_packet(code: TypeCode, id: u8, authenticator: Authenticator) -> RadiusPacket {
        RadiusPacket {
            id,
            code,
            authenticator,
            attributes: Vec::new()
        }
    }

    /// Initialises RADIUS packet from raw bytes
    ///
    /// Bytes past the length declared in the header are ignored as padding
    pub fn initialise_packet_from_bytes(bytes: &[u8]) -> Result<RadiusPacket, RadiusError> {
        let packet        = Self::declared_bytes(bytes)?;
        let code          = TypeCode::from_u8(packet[0])?;
        let id            = packet[1];
        let authenticator = packet[4..RADIUS_HEADER_LENGTH].try_into().map_err(|_| RadiusError::MalformedPacketError { error: String::from("truncated authenticator") })?;
        let attributes    = decode_attributes(&packet[RADIUS_HEADER_LENGTH..])?;

        Ok(RadiusPacket { id, code, authenticator, attributes })
    }

    /// Returns the part of a datagram covered by the length field of its header
    pub fn declared_bytes(bytes: &[u8]) -> Result<&[u8], RadiusError> {
        if bytes.len() < RADIUS_HEADER_LENGTH {
            return Err( RadiusError::MalformedPacketError { error: format!("packet is {} bytes long, header alone is {}", bytes.len(), RADIUS_HEADER_LENGTH) } )
        }

        let declared = u16::from_be_bytes([bytes[2], bytes[3]]) as usize;
        if declared < RADIUS_HEADER_LENGTH || declared > MAX_PACKET_LENGTH || declared > bytes.len() {
            return Err( RadiusError::MalformedPacketError { error: format!("declared length {} does not fit received {} bytes", declared, bytes.len()) } )
        }

        Ok(&bytes[..declared])
    }

    /// Sets attrbiutes
    pub fn set_attributes(&mut self, attributes: Vec<RadiusAttribute>) {
        self.attributes = attributes;
    }

    /// Returns RadiusPacket id
    pub fn id(&self) -> u8 {
        self.id
    }

    /// Returns RadiusPacket authenticator
    pub fn authenticator(&self) -> &Authenticator {
        &self.authenticator
    }

    /// Returns RadiusPacket code
    pub fn code(&self) -> &TypeCode {
        &self.code
    }

    /// Returns RadiusPacket attributes
    pub fn attributes(&self) -> &[RadiusAttribute] {
        &self.attributes
    }

    /// Returns the first attribute with given id
    pub fn attribute(&self, attr_id: u8) -> Option<&RadiusAttribute> {
        self.attributes.iter().find(|attr| attr.id() == attr_id)
    }

    /// Consumes packet, returning its attributes
    pub fn into_attributes(self) -> Vec<RadiusAttribute> {
        self.attributes
    }

    /// Serialises packet as is; no authenticator or password processing happens here
    pub fn to_bytes(&self) -> Result<Vec<u8>, RadiusError> {
        /*
         *          0               1               2         3
            0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
           +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
           |     Code      |  Identifier   |            Length             |
           +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
           |                                                               |
           |                         Authenticator                         |
           |                                                               |
           |                                                               |
           +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
           |  Attributes ...
           +-+-+-+-+-+-+-+-+-+-+-+-+-
         * Taken from https://tools.ietf.org/html/rfc2865#page-14
         */
        let packet_attr = encode_attributes(&self.attributes);
        let length      = RADIUS_HEADER_LENGTH + packet_attr.len();

        if length > MAX_PACKET_LENGTH {
            return Err( RadiusError::MalformedPacketError { error: format!("packet would be {} bytes long, limit is {}", length, MAX_PACKET_LENGTH) } )
        }

        let mut packet_bytes = Vec::with_capacity(length);
        packet_bytes.push(self.code.to_u8());
        packet_bytes.push(self.id);
        packet_bytes.extend_from_slice(&(length as u16).to_be_bytes());
        packet_bytes.extend_from_slice(&self.authenticator);
        packet_bytes.extend(packet_attr);

        Ok(packet_bytes)
    }
}
