//! Tests for error types and conversions

use searoute::{NoPathReason, OptionExt, SeaRouteError, VesselType};

#[test]
fn test_display_messages() {
    let err = SeaRouteError::InsufficientData {
        context: "distance model training".to_string(),
        found: 3,
        required: 5,
    };
    assert_eq!(
        err.to_string(),
        "insufficient data for distance model training: 3 available, 5 required"
    );

    let err = SeaRouteError::NoPathFound {
        origin: "p_nlrtm".to_string(),
        destination: "p_nobgo".to_string(),
        reason: NoPathReason::IterationCap,
    };
    assert_eq!(
        err.to_string(),
        "no path found from p_nlrtm to p_nobgo: iteration cap reached"
    );

    let err = SeaRouteError::PortCoordinatesMissing {
        port: "p_depot".to_string(),
    };
    assert_eq!(err.to_string(), "port p_depot has no coordinates");
}

#[test]
fn test_recoverable_errors() {
    assert!(
        SeaRouteError::NoPathFound {
            origin: "a".to_string(),
            destination: "b".to_string(),
            reason: NoPathReason::Disconnected,
        }
        .is_recoverable()
    );
    assert!(
        SeaRouteError::InsufficientData {
            context: "x".to_string(),
            found: 0,
            required: 1,
        }
        .is_recoverable()
    );
    assert!(!SeaRouteError::PortNotFound { port: "a".to_string() }.is_recoverable());
    assert!(!SeaRouteError::Source("timeout".to_string()).is_recoverable());
    assert!(!SeaRouteError::Config("bad".to_string()).is_recoverable());
}

#[test]
fn test_option_ext() {
    let missing: Option<u32> = None;
    assert!(matches!(
        missing.ok_or_port_not_found("p_x"),
        Err(SeaRouteError::PortNotFound { ref port }) if port == "p_x"
    ));
    assert!(matches!(
        missing.ok_or_coordinates_missing("p_x"),
        Err(SeaRouteError::PortCoordinatesMissing { .. })
    ));
    assert!(matches!(
        missing.ok_or_insufficient_data("pairs", 0, 2),
        Err(SeaRouteError::InsufficientData { found: 0, required: 2, .. })
    ));
    assert_eq!(Some(7).ok_or_port_not_found("p_x").unwrap(), 7);
}

#[test]
fn test_json_error_converts() {
    let err: SeaRouteError = serde_json::from_str::<Vec<u8>>("not json").unwrap_err().into();
    assert!(matches!(err, SeaRouteError::Json(_)));
}

#[test]
fn test_vessel_type_parsing() {
    assert_eq!(VesselType::parse("tanker").unwrap(), VesselType::TANKER);
    assert_eq!(VesselType::parse("  ro ro ").unwrap(), VesselType::RO_RO);
    assert_eq!(VesselType::parse("LNG_CARRIER").unwrap(), VesselType::LNG_CARRIER);
    assert_eq!(VesselType::parse("reefer-2").unwrap().as_str(), "REEFER-2");

    assert!(matches!(
        VesselType::parse("bulk/carrier"),
        Err(SeaRouteError::InvalidVesselType(_))
    ));
    assert!(VesselType::parse("").is_err());
}

#[test]
fn test_vessel_type_serde() {
    let json = serde_json::to_string(&VesselType::BULK_CARRIER).unwrap();
    assert_eq!(json, "\"BULK_CARRIER\"");

    let parsed: VesselType = serde_json::from_str("\"general cargo\"").unwrap();
    assert_eq!(parsed, VesselType::GENERAL_CARGO);
    assert!(serde_json::from_str::<VesselType>("\"a;b\"").is_err());
}

#[test]
fn test_no_path_reason_display() {
    assert_eq!(NoPathReason::Disconnected.to_string(), "no connecting legs");
    assert_eq!(NoPathReason::Deadline.to_string(), "deadline exceeded");
    assert_eq!(NoPathReason::Cancelled.to_string(), "cancelled");
}
