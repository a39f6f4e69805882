use rldriver::{train_in_race, AgentPars, AgentRegistry, RlDriver};
use racesim::pre::read_sim_pars::SimPars;
use racesim::SimConstants;

fn sim_pars() -> SimPars {
    serde_json::from_str(
        r#"{
            "race_pars": {"tot_no_laps": 15, "weather": "variable", "sc_prob": 0.1},
            "driver_pars_all": [
                {"name": "Driver A", "skill": 0.85, "aggression": 0.6},
                {"name": "Driver B", "skill": 0.75, "aggression": 0.4},
                {"name": "Driver C", "skill": 0.65, "aggression": 0.7}
            ]
        }"#,
    )
    .unwrap()
}

fn agent(seed: u64) -> RlDriver {
    RlDriver::new(&AgentPars {
        name: "Learner".to_owned(),
        seed: Some(seed),
        ..AgentPars::default()
    })
}

#[test]
fn training_updates_agent() {
    let sim_pars = sim_pars();
    let sim_consts = SimConstants::default();
    let mut agent = agent(11);

    for i in 0..5 {
        let summary = train_in_race(&mut agent, &sim_pars, &sim_consts, Some(100 + i)).unwrap();
        assert!(summary.final_position >= 1 && summary.final_position <= 4);
        assert!(summary.decisions >= 1 && summary.decisions <= 15);
        assert!(summary.pit_requests <= summary.decisions);
        if !summary.dnf {
            assert_eq!(summary.decisions, 15);
        }
    }

    assert_eq!(agent.races_completed, 5);
    assert_eq!(agent.learning_history.len(), 5);
    assert!(agent.q_table_len() > 0);
    assert!(agent.exploration_rate < 0.2);
    assert!(agent.avg_finish_position >= 1.0 && agent.avg_finish_position <= 4.0);
}

#[test]
fn training_is_reproducible() {
    let sim_pars = sim_pars();
    let sim_consts = SimConstants::default();

    let mut agent_a = agent(3);
    let mut agent_b = agent(3);
    for i in 0..3 {
        let a = train_in_race(&mut agent_a, &sim_pars, &sim_consts, Some(i)).unwrap();
        let b = train_in_race(&mut agent_b, &sim_pars, &sim_consts, Some(i)).unwrap();
        assert_eq!(a, b);
    }
    assert_eq!(agent_a.to_record(), agent_b.to_record());
}

#[test]
fn saved_agent_can_be_restored() {
    let sim_pars = sim_pars();
    let sim_consts = SimConstants::default();
    let mut registry = AgentRegistry::new();

    let pars = AgentPars {
        name: "Stored".to_owned(),
        seed: Some(5),
        ..AgentPars::default()
    };
    let trained = registry.get_or_create(&pars);
    train_in_race(trained, &sim_pars, &sim_consts, Some(42)).unwrap();

    let path = std::env::temp_dir().join(format!("rldriver_agent_{}.json", std::process::id()));
    let stored = registry.get("Stored").unwrap();
    stored.save_model(&path).unwrap();

    let restored = RlDriver::load_model(&path, Some(1)).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(restored.to_record(), stored.to_record());
    assert_eq!(restored.statistics(), stored.statistics());
}

#[test]
fn retirement_earns_no_completion_reward() {
    let sim_pars: SimPars = serde_json::from_str(
        r#"{"race_pars": {"tot_no_laps": 40, "weather": "dry", "sc_prob": 0.0}, "driver_pars_all": []}"#,
    )
    .unwrap();
    let sim_consts = SimConstants {
        p_incident_base: 1.0,
        ..SimConstants::default()
    };
    let mut agent = agent(21);

    let summary = train_in_race(&mut agent, &sim_pars, &sim_consts, Some(8)).unwrap();

    // an incident every lap, two out of five incident kinds retire the car
    assert!(summary.dnf);
    assert_eq!(summary.final_position, 1);
    assert_eq!(summary.rewards.len() as u32, summary.decisions);
    assert!(summary.decisions < 40);
    assert!((summary.total_reward - summary.rewards.iter().sum::<f64>()).abs() < 1e-9);

    // leader bonus 2 and at most 8 for the action, minus incident and DNF penalties
    let last = *summary.rewards.last().unwrap();
    assert!(last <= 2.0 + 8.0 - 15.0 - 30.0, "retirement step rewarded with {}", last);
    assert_eq!(agent.races_completed, 1);
    assert_eq!(agent.learning_history[0].position, 1);
}

#[test]
fn opponent_with_agent_name_is_not_booked() {
    let mut sim_pars = sim_pars();
    sim_pars.driver_pars_all[0].name = "Learner (RL)".to_owned();
    let sim_consts = SimConstants {
        p_incident_base: 0.0,
        p_incident_aggression: 0.0,
        p_incident_worn_tires: 0.0,
        p_incident_rain: 0.0,
        ..SimConstants::default()
    };

    let mut agent = agent(13);
    let summary = train_in_race(&mut agent, &sim_pars, &sim_consts, Some(2)).unwrap();

    assert!(!summary.dnf);
    assert_eq!(summary.decisions, 15);
    assert_eq!(agent.learning_history[0].position, summary.final_position);

    // the race completion reward of the last lap matches the booked classification
    let last = *summary.rewards.last().unwrap();
    assert!(last >= 20.0 - summary.final_position as f64 - 5.0 - 5.0);
}

#[test]
fn loading_missing_model_fails() {
    let res = RlDriver::load_model(std::path::Path::new("does/not/exist.json"), None);
    assert!(res.is_err());
}
