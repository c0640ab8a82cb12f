//! PostgreSQL type Object IDs (OIDs).
//!
//! PostgreSQL identifies types by numeric OIDs. This module defines
//! the well-known OIDs for the types the codec handles, including the
//! legacy types (abstime, reltime, tinterval) older servers report.

/// Boolean type
pub const BOOL: u32 = 16;

/// Byte array (bytea)
pub const BYTEA: u32 = 17;

/// Single character (char)
pub const CHAR: u32 = 18;

/// Name type (internal, 63-byte identifier)
pub const NAME: u32 = 19;

/// 8-byte signed integer (int8/bigint)
pub const INT8: u32 = 20;

/// 2-byte signed integer (int2/smallint)
pub const INT2: u32 = 21;

/// 4-byte signed integer (int4/integer)
pub const INT4: u32 = 23;

/// Variable-length text (text)
pub const TEXT: u32 = 25;

/// Object identifier (oid)
pub const OID: u32 = 26;

/// Tuple identifier (block, offset)
pub const TID: u32 = 27;

/// Transaction ID (xid)
pub const XID: u32 = 28;

/// Command ID (cid)
pub const CID: u32 = 29;

/// IPv4/IPv6 CIDR network
pub const CIDR: u32 = 650;

/// Geometric point
pub const POINT: u32 = 600;

/// Geometric line segment
pub const LSEG: u32 = 601;

/// Geometric path (open or closed)
pub const PATH: u32 = 602;

/// Geometric box
pub const BOX: u32 = 603;

/// Geometric polygon
pub const POLYGON: u32 = 604;

/// Single-precision floating point (float4/real)
pub const FLOAT4: u32 = 700;

/// Double-precision floating point (float8/double precision)
pub const FLOAT8: u32 = 701;

/// Absolute time in whole seconds (legacy)
pub const ABSTIME: u32 = 702;

/// Relative time in whole seconds (legacy)
pub const RELTIME: u32 = 703;

/// Time interval as a pair of absolute times (legacy)
pub const TINTERVAL: u32 = 704;

/// Unknown type (used for untyped literals)
pub const UNKNOWN: u32 = 705;

/// Geometric circle
pub const CIRCLE: u32 = 718;

/// Money type (whole cents on the wire)
pub const MONEY: u32 = 790;

/// MAC address (6 bytes)
pub const MACADDR: u32 = 829;

/// IPv4/IPv6 host address
pub const INET: u32 = 869;

/// Fixed-length blank-padded character (bpchar)
pub const BPCHAR: u32 = 1042;

/// Variable-length character with limit (varchar)
pub const VARCHAR: u32 = 1043;

/// Date (no time)
pub const DATE: u32 = 1082;

/// Time without time zone
pub const TIME: u32 = 1083;

/// Timestamp without time zone
pub const TIMESTAMP: u32 = 1114;

/// Timestamp with time zone
pub const TIMESTAMPTZ: u32 = 1184;

/// Time interval
pub const INTERVAL: u32 = 1186;

/// Time with time zone
pub const TIMETZ: u32 = 1266;

/// Bit string (fixed-length)
pub const BIT: u32 = 1560;

/// Bit string (variable-length)
pub const VARBIT: u32 = 1562;

/// Arbitrary precision numeric
pub const NUMERIC: u32 = 1700;

// ==================== Array Types ====================
// PostgreSQL array types have their own OIDs

/// cidr array
pub const CIDR_ARRAY: u32 = 651;

/// circle array
pub const CIRCLE_ARRAY: u32 = 719;

/// money array
pub const MONEY_ARRAY: u32 = 791;

/// bool array
pub const BOOL_ARRAY: u32 = 1000;

/// bytea array
pub const BYTEA_ARRAY: u32 = 1001;

/// char array
pub const CHAR_ARRAY: u32 = 1002;

/// name array
pub const NAME_ARRAY: u32 = 1003;

/// int2 array
pub const INT2_ARRAY: u32 = 1005;

/// int4 array
pub const INT4_ARRAY: u32 = 1007;

/// text array
pub const TEXT_ARRAY: u32 = 1009;

/// tid array
pub const TID_ARRAY: u32 = 1010;

/// xid array
pub const XID_ARRAY: u32 = 1011;

/// cid array
pub const CID_ARRAY: u32 = 1012;

/// bpchar array
pub const BPCHAR_ARRAY: u32 = 1014;

/// varchar array
pub const VARCHAR_ARRAY: u32 = 1015;

/// int8 array
pub const INT8_ARRAY: u32 = 1016;

/// point array
pub const POINT_ARRAY: u32 = 1017;

/// lseg array
pub const LSEG_ARRAY: u32 = 1018;

/// path array
pub const PATH_ARRAY: u32 = 1019;

/// box array
pub const BOX_ARRAY: u32 = 1020;

/// float4 array
pub const FLOAT4_ARRAY: u32 = 1021;

/// float8 array
pub const FLOAT8_ARRAY: u32 = 1022;

/// abstime array
pub const ABSTIME_ARRAY: u32 = 1023;

/// reltime array
pub const RELTIME_ARRAY: u32 = 1024;

/// tinterval array
pub const TINTERVAL_ARRAY: u32 = 1025;

/// polygon array
pub const POLYGON_ARRAY: u32 = 1027;

/// oid array
pub const OID_ARRAY: u32 = 1028;

/// macaddr array
pub const MACADDR_ARRAY: u32 = 1040;

/// inet array
pub const INET_ARRAY: u32 = 1041;

/// timestamp array
pub const TIMESTAMP_ARRAY: u32 = 1115;

/// date array
pub const DATE_ARRAY: u32 = 1182;

/// time array
pub const TIME_ARRAY: u32 = 1183;

/// timestamptz array
pub const TIMESTAMPTZ_ARRAY: u32 = 1185;

/// interval array
pub const INTERVAL_ARRAY: u32 = 1187;

/// numeric array
pub const NUMERIC_ARRAY: u32 = 1231;

/// timetz array
pub const TIMETZ_ARRAY: u32 = 1270;

/// bit array
pub const BIT_ARRAY: u32 = 1561;

/// varbit array
pub const VARBIT_ARRAY: u32 = 1563;

/// Get the array element OID for an array type OID.
///
/// Returns `None` if the OID is not a known array type.
#[must_use]
pub const fn element_oid(array_oid: u32) -> Option<u32> {
    match array_oid {
        CIDR_ARRAY => Some(CIDR),
        CIRCLE_ARRAY => Some(CIRCLE),
        MONEY_ARRAY => Some(MONEY),
        BOOL_ARRAY => Some(BOOL),
        BYTEA_ARRAY => Some(BYTEA),
        CHAR_ARRAY => Some(CHAR),
        NAME_ARRAY => Some(NAME),
        INT2_ARRAY => Some(INT2),
        INT4_ARRAY => Some(INT4),
        TEXT_ARRAY => Some(TEXT),
        TID_ARRAY => Some(TID),
        XID_ARRAY => Some(XID),
        CID_ARRAY => Some(CID),
        BPCHAR_ARRAY => Some(BPCHAR),
        VARCHAR_ARRAY => Some(VARCHAR),
        INT8_ARRAY => Some(INT8),
        POINT_ARRAY => Some(POINT),
        LSEG_ARRAY => Some(LSEG),
        PATH_ARRAY => Some(PATH),
        BOX_ARRAY => Some(BOX),
        FLOAT4_ARRAY => Some(FLOAT4),
        FLOAT8_ARRAY => Some(FLOAT8),
        ABSTIME_ARRAY => Some(ABSTIME),
        RELTIME_ARRAY => Some(RELTIME),
        TINTERVAL_ARRAY => Some(TINTERVAL),
        POLYGON_ARRAY => Some(POLYGON),
        OID_ARRAY => Some(OID),
        MACADDR_ARRAY => Some(MACADDR),
        INET_ARRAY => Some(INET),
        TIMESTAMP_ARRAY => Some(TIMESTAMP),
        DATE_ARRAY => Some(DATE),
        TIME_ARRAY => Some(TIME),
        TIMESTAMPTZ_ARRAY => Some(TIMESTAMPTZ),
        INTERVAL_ARRAY => Some(INTERVAL),
        NUMERIC_ARRAY => Some(NUMERIC),
        TIMETZ_ARRAY => Some(TIMETZ),
        BIT_ARRAY => Some(BIT),
        VARBIT_ARRAY => Some(VARBIT),
        _ => None,
    }
}

/// Get the array type OID for an element type OID.
///
/// Returns `None` if the OID doesn't have a known array type.
#[must_use]
pub const fn array_oid(element_oid: u32) -> Option<u32> {
    match element_oid {
        CIDR => Some(CIDR_ARRAY),
        CIRCLE => Some(CIRCLE_ARRAY),
        MONEY => Some(MONEY_ARRAY),
        BOOL => Some(BOOL_ARRAY),
        BYTEA => Some(BYTEA_ARRAY),
        CHAR => Some(CHAR_ARRAY),
        NAME => Some(NAME_ARRAY),
        INT2 => Some(INT2_ARRAY),
        INT4 => Some(INT4_ARRAY),
        TEXT => Some(TEXT_ARRAY),
        TID => Some(TID_ARRAY),
        XID => Some(XID_ARRAY),
        CID => Some(CID_ARRAY),
        BPCHAR => Some(BPCHAR_ARRAY),
        VARCHAR => Some(VARCHAR_ARRAY),
        INT8 => Some(INT8_ARRAY),
        POINT => Some(POINT_ARRAY),
        LSEG => Some(LSEG_ARRAY),
        PATH => Some(PATH_ARRAY),
        BOX => Some(BOX_ARRAY),
        FLOAT4 => Some(FLOAT4_ARRAY),
        FLOAT8 => Some(FLOAT8_ARRAY),
        ABSTIME => Some(ABSTIME_ARRAY),
        RELTIME => Some(RELTIME_ARRAY),
        TINTERVAL => Some(TINTERVAL_ARRAY),
        POLYGON => Some(POLYGON_ARRAY),
        OID => Some(OID_ARRAY),
        MACADDR => Some(MACADDR_ARRAY),
        INET => Some(INET_ARRAY),
        TIMESTAMP => Some(TIMESTAMP_ARRAY),
        DATE => Some(DATE_ARRAY),
        TIME => Some(TIME_ARRAY),
        TIMESTAMPTZ => Some(TIMESTAMPTZ_ARRAY),
        INTERVAL => Some(INTERVAL_ARRAY),
        NUMERIC => Some(NUMERIC_ARRAY),
        TIMETZ => Some(TIMETZ_ARRAY),
        BIT => Some(BIT_ARRAY),
        VARBIT => Some(VARBIT_ARRAY),
        _ => None,
    }
}

/// Check if the OID represents an array type.
#[must_use]
pub const fn is_array(type_oid: u32) -> bool {
    element_oid(type_oid).is_some()
}

/// Get a human-readable name for a type OID.
#[must_use]
pub const fn type_name(type_oid: u32) -> &'static str {
    match type_oid {
        BOOL => "bool",
        BYTEA => "bytea",
        CHAR => "char",
        NAME => "name",
        INT8 => "int8",
        INT2 => "int2",
        INT4 => "int4",
        TEXT => "text",
        OID => "oid",
        TID => "tid",
        XID => "xid",
        CID => "cid",
        CIDR => "cidr",
        POINT => "point",
        LSEG => "lseg",
        PATH => "path",
        BOX => "box",
        POLYGON => "polygon",
        FLOAT4 => "float4",
        FLOAT8 => "float8",
        ABSTIME => "abstime",
        RELTIME => "reltime",
        TINTERVAL => "tinterval",
        UNKNOWN => "unknown",
        CIRCLE => "circle",
        MONEY => "money",
        MACADDR => "macaddr",
        INET => "inet",
        BPCHAR => "bpchar",
        VARCHAR => "varchar",
        DATE => "date",
        TIME => "time",
        TIMESTAMP => "timestamp",
        TIMESTAMPTZ => "timestamptz",
        INTERVAL => "interval",
        TIMETZ => "timetz",
        BIT => "bit",
        VARBIT => "varbit",
        NUMERIC => "numeric",
        CIDR_ARRAY => "cidr[]",
        CIRCLE_ARRAY => "circle[]",
        MONEY_ARRAY => "money[]",
        BOOL_ARRAY => "bool[]",
        BYTEA_ARRAY => "bytea[]",
        CHAR_ARRAY => "char[]",
        NAME_ARRAY => "name[]",
        INT2_ARRAY => "int2[]",
        INT4_ARRAY => "int4[]",
        TEXT_ARRAY => "text[]",
        TID_ARRAY => "tid[]",
        XID_ARRAY => "xid[]",
        CID_ARRAY => "cid[]",
        BPCHAR_ARRAY => "bpchar[]",
        VARCHAR_ARRAY => "varchar[]",
        INT8_ARRAY => "int8[]",
        POINT_ARRAY => "point[]",
        LSEG_ARRAY => "lseg[]",
        PATH_ARRAY => "path[]",
        BOX_ARRAY => "box[]",
        FLOAT4_ARRAY => "float4[]",
        FLOAT8_ARRAY => "float8[]",
        ABSTIME_ARRAY => "abstime[]",
        RELTIME_ARRAY => "reltime[]",
        TINTERVAL_ARRAY => "tinterval[]",
        POLYGON_ARRAY => "polygon[]",
        OID_ARRAY => "oid[]",
        MACADDR_ARRAY => "macaddr[]",
        INET_ARRAY => "inet[]",
        TIMESTAMP_ARRAY => "timestamp[]",
        DATE_ARRAY => "date[]",
        TIME_ARRAY => "time[]",
        TIMESTAMPTZ_ARRAY => "timestamptz[]",
        INTERVAL_ARRAY => "interval[]",
        NUMERIC_ARRAY => "numeric[]",
        TIMETZ_ARRAY => "timetz[]",
        BIT_ARRAY => "bit[]",
        VARBIT_ARRAY => "varbit[]",
        _ => "unknown",
    }
}
