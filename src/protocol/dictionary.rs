//! Built-in RADIUS dictionary
//!
//! Only the attributes a NAS needs to authenticate users and report accounting are known here.
//! Packets may still carry any other attribute code: those are kept as opaque values.


/// User-Name
pub const USER_NAME:             u8 = 1;
/// User-Password
pub const USER_PASSWORD:         u8 = 2;
/// NAS-IP-Address
pub const NAS_IP_ADDRESS:        u8 = 4;
/// NAS-Port
pub const NAS_PORT:              u8 = 5;
/// Service-Type
pub const SERVICE_TYPE:          u8 = 6;
/// Framed-Protocol
pub const FRAMED_PROTOCOL:       u8 = 7;
/// Framed-IP-Address
pub const FRAMED_IP_ADDRESS:     u8 = 8;
/// Reply-Message
pub const REPLY_MESSAGE:         u8 = 18;
/// State
pub const STATE:                 u8 = 24;
/// Class
pub const CLASS:                 u8 = 25;
/// Session-Timeout
pub const SESSION_TIMEOUT:       u8 = 27;
/// Called-Station-Id
pub const CALLED_STATION_ID:     u8 = 30;
/// Calling-Station-Id
pub const CALLING_STATION_ID:    u8 = 31;
/// NAS-Identifier
pub const NAS_IDENTIFIER:        u8 = 32;
/// Acct-Status-Type
pub const ACCT_STATUS_TYPE:      u8 = 40;
/// Acct-Delay-Time
pub const ACCT_DELAY_TIME:       u8 = 41;
/// Acct-Session-Id
pub const ACCT_SESSION_ID:       u8 = 44;
/// Event-Timestamp
pub const EVENT_TIMESTAMP:       u8 = 55;
/// NAS-Port-Type
pub const NAS_PORT_TYPE:         u8 = 61;
/// EAP-Message
pub const EAP_MESSAGE:           u8 = 79;
/// Message-Authenticator
pub const MESSAGE_AUTHENTICATOR: u8 = 80;
/// NAS-IPv6-Address
pub const NAS_IPV6_ADDRESS:      u8 = 95;
/// Framed-IPv6-Prefix
pub const FRAMED_IPV6_PREFIX:    u8 = 97;


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Represents a list of supported data types
pub enum SupportedAttributeTypes {
    /// Rust's String; RADIUS "string" (UTF-8 is not assumed on the wire)
    AsciiString,
    /// Rust's \[u8\]; RADIUS "octets"
    ByteString,
    /// Rust's u32; RADIUS "integer"
    Integer,
    /// Rust's u32; RADIUS "date", seconds since epoch
    Date,
    /// Rust's \[u8;4\]; RADIUS "ipaddr"
    IPv4Addr,
    /// Rust's \[u8;16\]; RADIUS "ipv6addr"
    IPv6Addr,
    /// Rust's \[u8;18\]; RADIUS "ipv6prefix"
    IPv6Prefix
}


#[derive(Debug, PartialEq, Eq)]
/// Represents an ATTRIBUTE known to the engine
pub struct DictionaryAttribute {
    name:      &'static str,
    code:      u8,
    code_type: SupportedAttributeTypes
}

impl DictionaryAttribute {
    /// Returns the name of an attribute
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the code of an attribute
    pub fn code(&self) -> u8 {
        self.code
    }

    /// Returns the data type of an attribute
    pub fn code_type(&self) -> SupportedAttributeTypes {
        self.code_type
    }
}

const fn attribute(name: &'static str, code: u8, code_type: SupportedAttributeTypes) -> DictionaryAttribute {
    DictionaryAttribute { name, code, code_type }
}

static BUILTIN_ATTRIBUTES: [DictionaryAttribute; 23] = [
    attribute("User-Name",             USER_NAME,             SupportedAttributeTypes::AsciiString),
    attribute("User-Password",         USER_PASSWORD,         SupportedAttributeTypes::ByteString),
    attribute("NAS-IP-Address",        NAS_IP_ADDRESS,        SupportedAttributeTypes::IPv4Addr),
    attribute("NAS-Port",              NAS_PORT,              SupportedAttributeTypes::Integer),
    attribute("Service-Type",          SERVICE_TYPE,          SupportedAttributeTypes::Integer),
    attribute("Framed-Protocol",       FRAMED_PROTOCOL,       SupportedAttributeTypes::Integer),
    attribute("Framed-IP-Address",     FRAMED_IP_ADDRESS,     SupportedAttributeTypes::IPv4Addr),
    attribute("Reply-Message",         REPLY_MESSAGE,         SupportedAttributeTypes::AsciiString),
    attribute("State",                 STATE,                 SupportedAttributeTypes::ByteString),
    attribute("Class",                 CLASS,                 SupportedAttributeTypes::ByteString),
    attribute("Session-Timeout",       SESSION_TIMEOUT,       SupportedAttributeTypes::Integer),
    attribute("Called-Station-Id",     CALLED_STATION_ID,     SupportedAttributeTypes::AsciiString),
    attribute("Calling-Station-Id",    CALLING_STATION_ID,    SupportedAttributeTypes::AsciiString),
    attribute("NAS-Identifier",        NAS_IDENTIFIER,        SupportedAttributeTypes::AsciiString),
    attribute("Acct-Status-Type",      ACCT_STATUS_TYPE,      SupportedAttributeTypes::Integer),
    attribute("Acct-Delay-Time",       ACCT_DELAY_TIME,       SupportedAttributeTypes::Integer),
    attribute("Acct-Session-Id",       ACCT_SESSION_ID,       SupportedAttributeTypes::AsciiString),
    attribute("Event-Timestamp",       EVENT_TIMESTAMP,       SupportedAttributeTypes::Date),
    attribute("NAS-Port-Type",         NAS_PORT_TYPE,         SupportedAttributeTypes::Integer),
    attribute("EAP-Message",           EAP_MESSAGE,           SupportedAttributeTypes::ByteString),
    attribute("Message-Authenticator", MESSAGE_AUTHENTICATOR, SupportedAttributeTypes::ByteString),
    attribute("NAS-IPv6-Address",      NAS_IPV6_ADDRESS,      SupportedAttributeTypes::IPv6Addr),
    attribute("Framed-IPv6-Prefix",    FRAMED_IPV6_PREFIX,    SupportedAttributeTypes::IPv6Prefix),
];


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Represents the set of attributes the engine knows how to name and type
pub struct Dictionary {
    attributes: &'static [DictionaryAttribute]
}

impl Default for Dictionary {
    fn default() -> Dictionary {
        Dictionary { attributes: &BUILTIN_ATTRIBUTES }
    }
}

impl Dictionary {
    /// Returns all attributes known to the dictionary
    pub fn attributes(&self) -> &[DictionaryAttribute] {
        self.attributes
    }

    /// Returns ATTRIBUTE with given name
    pub fn attribute_by_name(&self, attribute_name: &str) -> Option<&DictionaryAttribute> {
        self.attributes.iter().find(|attr| attr.name() == attribute_name)
    }

    /// Returns ATTRIBUTE with given code
    pub fn attribute_by_id(&self, attribute_code: u8) -> Option<&DictionaryAttribute> {
        self.attributes.iter().find(|attr| attr.code() == attribute_code)
    }
}
