#[cfg(test)]
mod tests {
    use crate::commands::MissionCommand;
    use crate::config::{ConfigError, MissionConfig};
    use crate::constants::*;
    use crate::enums::*;
    use crate::events::{MissionEvent, MissionEventKind};
    use crate::state::MissionSnapshot;
    use crate::types::*;

    #[test]
    fn test_distance_quarter_circumference() {
        let equator = Coordinates::from_degrees(0.0, 0.0);
        let pole = Coordinates::from_degrees(90.0, 0.0);
        let expected = MARS_RADIUS_KM * std::f64::consts::FRAC_PI_2;
        assert!(
            (equator.distance_to(&pole) - expected).abs() < 1e-6,
            "Equator to pole should be a quarter great circle, got {}",
            equator.distance_to(&pole)
        );
    }

    #[test]
    fn test_distance_is_symmetric() {
        let a = Coordinates::from_degrees(-4.5, 137.4);
        let b = Coordinates::from_degrees(18.4, 77.5);
        assert!((a.distance_to(&b) - b.distance_to(&a)).abs() < 1e-9);
        assert_eq!(a.distance_to(&a), 0.0);
    }

    #[test]
    fn test_bearing_cardinal_directions() {
        let origin = Coordinates::from_degrees(0.0, 0.0);
        let north = Coordinates::from_degrees(1.0, 0.0);
        let east = Coordinates::from_degrees(0.0, 1.0);
        assert!(origin.bearing_to(&north).abs() < 1e-9);
        assert!((origin.bearing_to(&east) - std::f64::consts::FRAC_PI_2).abs() < 1e-9);
    }

    #[test]
    fn test_destination_travels_requested_distance() {
        let start = Coordinates::from_degrees(-14.6, 175.5);
        for bearing_deg in [0.0_f64, 45.0, 170.0, 290.0] {
            let end = start.destination(bearing_deg.to_radians(), 120.0);
            assert!(
                (start.distance_to(&end) - 120.0).abs() < 1e-6,
                "Bearing {bearing_deg}: expected 120 km, got {}",
                start.distance_to(&end)
            );
        }
    }

    #[test]
    fn test_toward_stops_on_target() {
        let a = Coordinates::from_degrees(0.0, 0.0);
        let b = Coordinates::from_degrees(0.0, 1.0);
        let total = a.distance_to(&b);

        let halfway = a.toward(&b, total / 2.0);
        assert!((a.distance_to(&halfway) - total / 2.0).abs() < 1e-6);

        let overshoot = a.toward(&b, total * 3.0);
        assert_eq!(overshoot, b);
    }

    #[test]
    fn test_longitude_wraps() {
        let c = Coordinates::from_degrees(0.0, 200.0);
        assert!((c.lon.to_degrees() - -160.0).abs() < 1e-9);
    }

    #[test]
    fn test_mars_time_sols() {
        let mut t = MarsTime::default();
        assert_eq!(t.mission_sol(), 1);
        t.advance(2_450.0);
        assert_eq!(t.sols(), 2);
        assert_eq!(t.mission_sol(), 3);
        assert!((t.millisol_of_sol() - 450.0).abs() < 1e-9);
        assert_eq!(t.since(MarsTime::new(2_500.0)), 0.0);
    }

    #[test]
    fn test_clock_pulse_strictly_increases() {
        let mut pulse = ClockPulse::default();
        for _ in 0..10 {
            let next = pulse.next(DEFAULT_PULSE_MILLISOLS);
            assert!(next.tick > pulse.tick);
            assert!(next.time.millisols > pulse.time.millisols);
            pulse = next;
        }
        assert!((pulse.time.millisols - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_status_classes() {
        assert_eq!(MissionStatus::NotEnoughMembers.class(), StatusClass::Capacity);
        assert_eq!(MissionStatus::CannotLoadResources.class(), StatusClass::Resource);
        assert_eq!(MissionStatus::MiningSiteNotBeDetermined.class(), StatusClass::Site);
        assert_eq!(
            MissionStatus::NewConstructionStageNotDetermined.class(),
            StatusClass::Execution
        );
        assert_eq!(MissionStatus::MissionAccomplished.class(), StatusClass::Outcome);
        assert!(MissionStatus::MissionAccomplished.is_success());
        assert!(!MissionStatus::MedicalEmergency.is_success());
        assert_eq!(MissionStatus::Custom("Dust storm".into()).name(), "Dust storm");
    }

    #[test]
    fn test_mission_kind_vehicles() {
        assert_eq!(MissionKind::Construction.vehicle_kind(), None);
        assert_eq!(MissionKind::Delivery.vehicle_kind(), Some(VehicleKind::Drone));
        assert_eq!(MissionKind::Mining.vehicle_kind(), Some(VehicleKind::Rover));
        assert!(MissionKind::Exploration.is_eva());
        assert!(!MissionKind::Trade.is_eva());
        for kind in MissionKind::ALL {
            assert!(kind.default_min_members() <= kind.default_capacity());
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        MissionConfig::default().validate().unwrap();
    }

    #[test]
    fn test_config_partial_override() {
        let json = r#"{ "sites": { "collection_sites": 1 }, "trade": { "min_profit": 5.0 } }"#;
        let config = MissionConfig::from_json_str(json).unwrap();
        assert_eq!(config.sites.collection_sites, 1);
        assert_eq!(config.trade.min_profit, 5.0);
        // Untouched fields keep their defaults.
        assert_eq!(config.sites.confidence_base, 3);
        assert_eq!(config.life_support.safety_margin, 1.5);
    }

    #[test]
    fn test_config_rejects_bad_margin() {
        let json = r#"{ "life_support": { "safety_margin": 0.5 } }"#;
        match MissionConfig::from_json_str(json) {
            Err(ConfigError::Invalid { field, .. }) => {
                assert_eq!(field, "life_support.safety_margin")
            }
            other => panic!("Expected invalid margin, got {other:?}"),
        }
    }

    #[test]
    fn test_config_rejects_malformed_json() {
        assert!(matches!(
            MissionConfig::from_json_str("{ not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    /// Commands arrive as tagged JSON from the runner.
    #[test]
    fn test_command_tagged_json() {
        let json = r#"{ "type": "StartMission", "kind": "Exploration", "starter": 4 }"#;
        let cmd: MissionCommand = serde_json::from_str(json).unwrap();
        match cmd {
            MissionCommand::StartMission { kind, starter } => {
                assert_eq!(kind, MissionKind::Exploration);
                assert_eq!(starter, AgentId(4));
            }
            other => panic!("Unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_event_serde() {
        let event = MissionEvent {
            mission: MissionId(7),
            tick: 12,
            kind: MissionEventKind::StatusAdded {
                status: MissionStatus::NoTradingSettlement,
            },
        };
        let json = serde_json::to_string(&event).unwrap();
        let back: MissionEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, back);
    }

    #[test]
    fn test_empty_snapshot_is_small() {
        let json = serde_json::to_string(&MissionSnapshot::default()).unwrap();
        assert!(json.len() < 256, "Empty snapshot was {} bytes", json.len());
    }
}
