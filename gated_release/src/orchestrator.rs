//! Wiring of the three roles, either in one process over socket pairs or
//! as separate networked processes.

use std::net::TcpListener;
use std::thread;

use crypto_core::{local_channel_pair, AbstractChannel, NetChannel};
use pvss::Secret;
use tracing::{info, warn};
use twopc::AuditReport;

use crate::config::ProtocolConfig;
use crate::error::{ProtocolError, RequesterError};
use crate::gatekeeper::GatekeeperSession;
use crate::issuer::IssuerSession;
use crate::proof::ProofSystem;
use crate::requester::RequesterSession;

/// What a local run produced on each side.
#[derive(Debug)]
pub struct LocalOutcome {
    /// The dealt secret, as the issuer knows it.
    pub issuer_secret: Option<Secret>,
    /// Audit reports cross-checked by the issuer.
    pub audits: Vec<AuditReport>,
    /// The requester's view: the reconstructed secret or why it failed.
    pub result: Result<Secret, RequesterError>,
}

/// Labels, proof, release and reconstruction for one requester.
pub fn request_secret<P: ProofSystem, I: AbstractChannel, G: AbstractChannel>(
    requester: &mut RequesterSession<P>,
    issuer: &mut I,
    gatekeeper: &mut G,
    circuit_id: &str,
    attributes: &[bool],
) -> Result<Secret, RequesterError> {
    let grant = requester.request_labels(issuer, circuit_id)?.clone();
    let artifact = requester.build_proof(attributes, &grant)?;
    requester.submit_and_reconstruct(gatekeeper, artifact)
}

fn gatekeeper_session(
    config: &ProtocolConfig,
) -> Result<GatekeeperSession<Box<dyn ProofSystem + Send>>, ProtocolError> {
    Ok(GatekeeperSession::new(
        config.identities.clone(),
        config.release_set.clone(),
        config.threshold,
        config.circuit_id.clone(),
        config.build_proof_system()?,
    )?)
}

fn issuer_session(config: &ProtocolConfig) -> Result<IssuerSession, ProtocolError> {
    let mut issuer = IssuerSession::new(config.oblivious_transfer);
    for circ in config.load_circuits()? {
        issuer.prepare(circ)?;
    }
    Ok(issuer)
}

/// Run issuer and gatekeeper on their own threads and the requester on the
/// calling thread.
pub fn run_local(
    config: &ProtocolConfig,
    attributes: &[bool],
) -> Result<LocalOutcome, ProtocolError> {
    config.validate()?;
    let mut issuer = issuer_session(config)?;
    let mut gatekeeper = gatekeeper_session(config)?;
    let mut requester = RequesterSession::new(config.build_proof_system()?);

    let (mut issuer_to_gk, mut gk_to_issuer) = local_channel_pair()?;
    let (mut issuer_to_req, mut req_to_issuer) = local_channel_pair()?;
    let (mut gk_to_req, mut req_to_gk) = local_channel_pair()?;

    let threshold = config.threshold;
    let issuer_handle = thread::Builder::new()
        .name("issuer".to_string())
        .spawn(move || -> Result<_, ProtocolError> {
            issuer.setup_gatekeeper(&mut issuer_to_gk, threshold)?;
            let audits = issuer.run_audits(&mut issuer_to_gk)?;
            drop(issuer_to_gk);
            issuer.serve_requester(&mut issuer_to_req)?;
            Ok((issuer.secret(), audits))
        })?;

    let gatekeeper_handle = thread::Builder::new()
        .name("gatekeeper".to_string())
        .spawn(move || -> Result<(), ProtocolError> {
            gatekeeper.serve_issuer(&mut gk_to_issuer)?;
            drop(gk_to_issuer);
            gatekeeper.serve_requester(&mut gk_to_req)?;
            gatekeeper.terminate();
            Ok(())
        })?;

    let result = request_secret(
        &mut requester,
        &mut req_to_issuer,
        &mut req_to_gk,
        &config.circuit_id,
        attributes,
    );
    drop(req_to_issuer);
    drop(req_to_gk);

    let (issuer_secret, audits) = issuer_handle
        .join()
        .map_err(|_| ProtocolError::ThreadPanicked("issuer"))??;
    gatekeeper_handle
        .join()
        .map_err(|_| ProtocolError::ThreadPanicked("gatekeeper"))??;

    match &result {
        Ok(secret) if Some(*secret) == issuer_secret => info!("requester recovered the secret"),
        Ok(_) => warn!("requester reconstructed a different secret"),
        Err(e) => info!(error = %e, "requester did not recover the secret"),
    }
    Ok(LocalOutcome {
        issuer_secret,
        audits,
        result,
    })
}

/// Serve the gatekeeper once, then requesters one connection at a time.
pub fn run_issuer(config: &ProtocolConfig) -> Result<(), ProtocolError> {
    let timeout = config.network.read_timeout();
    let mut issuer = issuer_session(config)?;
    let listener = TcpListener::bind(&config.network.issuer_addr)?;
    info!(addr = %config.network.issuer_addr, "issuer listening");

    let mut gatekeeper = NetChannel::accept(&listener, timeout)?;
    issuer.setup_gatekeeper(&mut gatekeeper, config.threshold)?;
    issuer.run_audits(&mut gatekeeper)?;
    drop(gatekeeper);

    loop {
        let mut channel = NetChannel::accept(&listener, timeout)?;
        if let Err(e) = issuer.serve_requester(&mut channel) {
            warn!(error = %e, "requester connection failed");
        }
    }
}

/// Set up with the issuer, then gate requesters one connection at a time.
pub fn run_gatekeeper(config: &ProtocolConfig) -> Result<(), ProtocolError> {
    let timeout = config.network.read_timeout();
    let mut session = gatekeeper_session(config)?;
    let listener = TcpListener::bind(&config.network.gatekeeper_addr)?;

    let mut issuer = NetChannel::connect(&config.network.issuer_addr, timeout)?;
    session.serve_issuer(&mut issuer)?;
    drop(issuer);
    info!(addr = %config.network.gatekeeper_addr, "gatekeeper ready");

    loop {
        let mut channel = NetChannel::accept(&listener, timeout)?;
        if let Err(e) = session.serve_requester(&mut channel) {
            warn!(error = %e, "requester connection failed");
        }
    }
}

pub fn run_requester(config: &ProtocolConfig, attributes: &[bool]) -> Result<Secret, ProtocolError> {
    let timeout = config.network.read_timeout();
    let mut requester = RequesterSession::new(config.build_proof_system()?);
    let mut issuer = NetChannel::connect(&config.network.issuer_addr, timeout)?;
    let mut gatekeeper = NetChannel::connect(&config.network.gatekeeper_addr, timeout)?;
    Ok(request_secret(
        &mut requester,
        &mut issuer,
        &mut gatekeeper,
        &config.circuit_id,
        attributes,
    )?)
}
