use std::path::PathBuf;
use std::thread;

use rstest::*;

use circuit::Circuit;
use crypto_core::{local_channel_pair, AbstractChannel, AesRng};
use gated_release::{
    run_local, ConfigError, GatekeeperError, GatekeeperSession, GatekeeperState, IssuerSession,
    PolicyWitness, ProofArtifact, ProofSystem, ProtocolConfig, ProtocolError, RejectReason,
    ReleaseReply, ReleaseRequest, RequesterError, RequesterSession, SetupMsg,
    TransparentProofSystem,
};
use pvss::{reconstruct, Keypair, PvssError};

const CIRCUITS: &str = "../circuit/circuit_files/default.json";

fn config() -> ProtocolConfig {
    ProtocolConfig {
        circuit_file: PathBuf::from(CIRCUITS),
        ..ProtocolConfig::default()
    }
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|n| n.to_string()).collect()
}

fn smart() -> Circuit {
    Circuit::load_file(CIRCUITS).unwrap().remove(0)
}

#[rstest]
#[case::satisfied(vec![true, false], true)]
#[case::none(vec![false, false], false)]
#[case::second_only(vec![false, true], false)]
#[case::both(vec![true, true], false)]
fn attr1_and_not_attr2(
    #[case] attributes: Vec<bool>,
    #[case] released: bool,
    #[values(true, false)] oblivious_transfer: bool,
) {
    let config = ProtocolConfig {
        oblivious_transfer,
        ..config()
    };
    let outcome = run_local(&config, &attributes).unwrap();

    assert_eq!(outcome.audits.len(), 2);
    for (report, circ) in outcome.audits.iter().zip(Circuit::load_file(CIRCUITS).unwrap()) {
        assert_eq!(*report, twopc::plaintext_report(&circ).unwrap());
    }

    if released {
        let secret = outcome.result.unwrap();
        assert_eq!(Some(secret), outcome.issuer_secret);
    } else {
        assert!(matches!(
            outcome.result,
            Err(RequesterError::GateRejected(RejectReason::PolicyNotSatisfied))
        ));
    }
}

#[rstest]
#[case::alice_boris(&["Alice", "Boris"], 2)]
#[case::alice_chris(&["Alice", "Chris"], 2)]
#[case::boris_chris(&["Boris", "Chris"], 2)]
#[case::all_three(&["Alice", "Boris", "Chris"], 2)]
#[case::full_threshold(&["Alice", "Boris", "Chris"], 3)]
fn any_release_set_meeting_the_threshold(#[case] release_set: &[&str], #[case] threshold: usize) {
    let config = ProtocolConfig {
        release_set: names(release_set),
        threshold,
        ..config()
    };
    let outcome = run_local(&config, &[true, false]).unwrap();
    assert_eq!(outcome.result.unwrap(), outcome.issuer_secret.unwrap());
}

#[test]
fn too_few_identities_is_refused_up_front() {
    let config = ProtocolConfig {
        identities: names(&["Alice"]),
        release_set: names(&["Alice"]),
        ..config()
    };
    assert!(matches!(
        run_local(&config, &[true, false]),
        Err(ProtocolError::Config(ConfigError::TooFewIdentities {
            threshold: 2,
            supplied: 1
        }))
    ));
}

#[test]
fn unknown_circuit_is_reported() {
    let (mut req_channel, mut issuer_channel) = local_channel_pair().unwrap();
    let handle = thread::spawn(move || {
        let mut issuer = IssuerSession::new(true);
        issuer.prepare(smart()).unwrap();
        let params = issuer.init_dealer();
        let mut rng = AesRng::new();
        let keys = ["Alice", "Boris"]
            .iter()
            .map(|n| (n.to_string(), Keypair::generate(&mut rng, &params, *n).public))
            .collect();
        issuer.distribute_shares(&keys, 2).unwrap();
        issuer.serve_requester(&mut issuer_channel).unwrap();
    });

    let mut requester = RequesterSession::new(TransparentProofSystem::new(smart()).unwrap());
    assert!(matches!(
        requester.request_labels(&mut req_channel, "Audit"),
        Err(RequesterError::CircuitNotFound(id)) if id == "Audit"
    ));
    // The session stays usable for a known id.
    assert!(requester.request_labels(&mut req_channel, "Smart").is_ok());

    drop(req_channel);
    handle.join().unwrap();
}

#[test]
fn replayed_artifact_releases_the_same_shares_once() {
    let (mut issuer_channel, mut gk_issuer_channel) = local_channel_pair().unwrap();
    let (mut req_channel, mut gk_req_channel) = local_channel_pair().unwrap();

    let mut issuer = IssuerSession::new(false);
    issuer.prepare(smart()).unwrap();
    let issuer_handle = thread::spawn(move || {
        issuer.setup_gatekeeper(&mut issuer_channel, 2).unwrap();
        issuer.run_audits(&mut issuer_channel).unwrap();
        issuer
    });
    let gk_handle = thread::spawn(move || {
        let mut gk = GatekeeperSession::new(
            names(&["Alice", "Boris", "Chris"]),
            names(&["Alice", "Boris"]),
            2,
            "Smart",
            TransparentProofSystem::new(smart()).unwrap(),
        )
        .unwrap();
        gk.serve_issuer(&mut gk_issuer_channel).unwrap();
        gk.serve_requester(&mut gk_req_channel).unwrap();
        gk
    });

    let issuer = issuer_handle.join().unwrap();
    let grant = issuer.retrieve_labels("Smart", &[]).unwrap();
    let receiver = Keypair::generate(&mut AesRng::new(), &grant.sharing.params, "requester");

    let prover = TransparentProofSystem::new(smart()).unwrap();
    let (proof, public_signals) = prover
        .prove(&PolicyWitness {
            circuit_id: "Smart".to_string(),
            attributes: vec![true, false],
            labels: grant.labels.values().copied().collect(),
            receiver: receiver.public,
        })
        .unwrap();
    let artifact = ProofArtifact {
        circuit_id: "Smart".to_string(),
        proof,
        public_signals,
        verification_key: prover.verification_key().unwrap(),
        receiver: receiver.public,
    };
    let request = ReleaseRequest {
        artifact,
        receiver: receiver.public,
    };

    req_channel.send_msg(&request).unwrap();
    let first: ReleaseReply = req_channel.recv_msg().unwrap();
    req_channel.send_msg(&request).unwrap();
    let second: ReleaseReply = req_channel.recv_msg().unwrap();
    assert_eq!(first, second);

    let shares = match first {
        ReleaseReply::Released(shares) => shares,
        other => panic!("unexpected reply {:?}", other),
    };
    let secret = reconstruct(&receiver, &shares, 2).unwrap();
    assert_eq!(Some(secret), issuer.secret());
    assert_eq!(
        reconstruct(&receiver, &shares[..1], 2),
        Err(PvssError::InsufficientShares {
            threshold: 2,
            supplied: 1
        })
    );

    drop(req_channel);
    let gk = gk_handle.join().unwrap();
    assert_eq!(gk.reencryption_count(), 2);
    assert_eq!(gk.state(), GatekeeperState::Ready);
}

#[test]
fn gatekeeper_refuses_out_of_order_setup() {
    let (mut issuer_channel, mut gk_channel) = local_channel_pair().unwrap();
    let handle = thread::spawn(move || {
        issuer_channel
            .send_msg(&SetupMsg::SharesAccepted)
            .unwrap();
    });

    let mut gk = GatekeeperSession::new(
        names(&["Alice", "Boris"]),
        names(&["Alice", "Boris"]),
        2,
        "Smart",
        TransparentProofSystem::new(smart()).unwrap(),
    )
    .unwrap();
    assert!(matches!(
        gk.serve_issuer(&mut gk_channel),
        Err(GatekeeperError::UnexpectedMessage("Setup"))
    ));
    assert_eq!(gk.state(), GatekeeperState::AwaitParams);
    handle.join().unwrap();
}
