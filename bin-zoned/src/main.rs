use bytes::BytesMut;
use clap::Parser;
use std::collections::HashSet;
use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::process;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::{TcpListener, UdpSocket};
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tokio::sync::RwLock;

use dns_auth::net_util::{read_tcp_bytes, send_tcp_bytes, send_udp_bytes_to};
use dns_auth::response::{
    handle_query, ResponsePolicy, Transport, DEFAULT_EDNS_UDP_ADVERTISED,
};
use dns_types::protocol::types::{DomainName, Message, Rcode};
use dns_types::zones::types::Zones;

mod fs_util;
mod metrics;
mod settings;

use crate::fs_util::zone_from_file;
use crate::metrics::*;
use crate::settings::Settings;

/// Arguments shared by the listener tasks.
#[derive(Debug, Clone)]
struct ListenArgs {
    /// The zone store.  Each request clones the inner `Arc` once and
    /// resolves against that snapshot; a reload swaps in a whole new
    /// store without disturbing requests in flight.
    zones: Arc<RwLock<Arc<Zones>>>,
    policy: ResponsePolicy,
}

/// Parse a raw message and answer it.  Unparseable messages are
/// logged and dropped with no response at all.
async fn handle_raw_message(
    args: &ListenArgs,
    octets: &[u8],
    peer: SocketAddr,
    transport: Transport,
) -> Option<BytesMut> {
    let query = match Message::from_octets(octets) {
        Ok(query) => query,
        Err(error) => {
            tracing::warn!(?peer, ?error, "dropping malformed query");
            return None;
        }
    };

    if let Some(question) = query.questions.first() {
        tracing::info!(
            ?transport,
            ?peer,
            id = %query.header.id,
            %question,
            size = %octets.len(),
            "query"
        );
    }

    let zones = args.zones.read().await.clone();
    handle_query(&zones, args.policy, &query, transport)
}

/// Bump the response counter from the already-encoded reply: AA and
/// TC live in octet 2, the (header) rcode in octet 3.
fn observe_response(octets: &[u8]) {
    if octets.len() < 12 {
        return;
    }
    let aa = octets[2] & 0b0000_0100 != 0;
    let tc = octets[2] & 0b0000_0010 != 0;
    let rcode = Rcode::from(u16::from(octets[3] & 0b0000_1111));

    DNS_RESPONSES_TOTAL
        .with_label_values(&[&aa.to_string(), &tc.to_string(), &rcode.to_string()])
        .inc();
}

async fn listen_tcp_task(args: ListenArgs, listener: TcpListener) {
    loop {
        match listener.accept().await {
            Ok((mut stream, peer)) => {
                DNS_REQUESTS_TOTAL.with_label_values(&["tcp"]).inc();
                let args = args.clone();
                tokio::spawn(async move {
                    let timer = DNS_RESPONSE_TIME_SECONDS
                        .with_label_values(&["tcp"])
                        .start_timer();
                    match read_tcp_bytes(&mut stream).await {
                        Ok(octets) => {
                            if let Some(response) =
                                handle_raw_message(&args, octets.as_ref(), peer, Transport::Tcp)
                                    .await
                            {
                                observe_response(&response);
                                if let Err(error) = send_tcp_bytes(&mut stream, &response).await {
                                    tracing::debug!(?peer, ?error, "TCP send error");
                                }
                            }
                        }
                        Err(error) => {
                            tracing::debug!(?peer, ?error, "TCP read error");
                        }
                    }
                    timer.observe_duration();
                });
            }
            Err(error) => tracing::debug!(?error, "TCP accept error"),
        }
    }
}

async fn listen_udp_task(args: ListenArgs, socket: UdpSocket) {
    let (tx, mut rx) = mpsc::channel::<(BytesMut, SocketAddr, prometheus::HistogramTimer)>(32);
    let mut buf = vec![0_u8; 2048];

    loop {
        tokio::select! {
            Ok((size, peer)) = socket.recv_from(&mut buf) => {
                DNS_REQUESTS_TOTAL.with_label_values(&["udp"]).inc();
                let octets = BytesMut::from(&buf[..size]);
                let reply = tx.clone();
                let args = args.clone();
                tokio::spawn(async move {
                    let timer = DNS_RESPONSE_TIME_SECONDS
                        .with_label_values(&["udp"])
                        .start_timer();
                    if let Some(response) =
                        handle_raw_message(&args, octets.as_ref(), peer, Transport::Udp).await
                    {
                        if let Err(error) = reply.send((response, peer, timer)).await {
                            tracing::debug!(?peer, ?error, "UDP reply channel error");
                        }
                    }
                });
            }

            Some((response, peer, timer)) = rx.recv() => {
                observe_response(&response);
                if let Err(error) = send_udp_bytes_to(&socket, peer, &response).await {
                    tracing::debug!(?peer, ?error, "UDP send error");
                }
                timer.observe_duration();
            }
        }
    }
}

/// Load every configured zone.  A zone file whose apex does not match
/// its configured name is an error, as is any parse or read failure.
async fn load_zones(settings: &Settings) -> Option<Zones> {
    let mut is_error = false;
    let mut zones = Zones::new();

    for entry in &settings.zones {
        let name = if entry.name.ends_with('.') {
            entry.name.clone()
        } else {
            format!("{}.", entry.name)
        };
        let Some(origin) = DomainName::from_dotted_string(&name) else {
            tracing::warn!(name = %entry.name, "invalid zone name");
            is_error = true;
            continue;
        };

        match zone_from_file(&entry.file).await {
            Ok(Ok(zone)) => {
                if zone.apex() == &origin {
                    zones.insert(zone);
                } else {
                    tracing::warn!(
                        file = %entry.file,
                        expected = %origin,
                        actual = %zone.apex(),
                        "zone file apex does not match configured name"
                    );
                    is_error = true;
                }
            }
            Ok(Err(error)) => {
                tracing::warn!(file = %entry.file, %error, "could not parse zone file");
                is_error = true;
            }
            Err(error) => {
                tracing::warn!(file = %entry.file, ?error, "could not read zone file");
                is_error = true;
            }
        }
    }

    if is_error || zones.is_empty() {
        None
    } else {
        Some(zones)
    }
}

/// Re-read all zone files on SIGHUP and swap the new store in.  On
/// failure the previous store stays.
async fn reload_task(zones_lock: Arc<RwLock<Arc<Zones>>>, settings: Settings) {
    let mut stream = match signal(SignalKind::hangup()) {
        Ok(s) => s,
        Err(error) => {
            tracing::error!(?error, "could not subscribe to SIGHUP");
            process::exit(1);
        }
    };

    loop {
        stream.recv().await;

        tracing::info!("SIGHUP received, reloading zones");
        let start = Instant::now();
        if let Some(zones) = load_zones(&settings).await {
            let mut lock = zones_lock.write().await;
            *lock = Arc::new(zones);
            drop(lock);
            ZONE_RELOAD_TOTAL.with_label_values(&["success"]).inc();
            tracing::info!(duration_seconds = %start.elapsed().as_secs_f64(), "reload complete");
        } else {
            ZONE_RELOAD_TOTAL.with_label_values(&["failure"]).inc();
            tracing::warn!("reload failed, keeping previous zones");
        }
    }
}

/// Exit cleanly on SIGTERM or ctrl-c.
async fn shutdown_task() {
    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(error) => {
            tracing::error!(?error, "could not subscribe to SIGTERM");
            process::exit(1);
        }
    };

    tokio::select! {
        _ = sigterm.recv() => (),
        _ = tokio::signal::ctrl_c() => (),
    }

    tracing::info!("termination signal received, exiting");
    process::exit(0);
}

/// If started as root with a user or group configured, drop to them.
/// Has to happen after the sockets are bound.
fn drop_privileges(user: Option<&str>, group: Option<&str>) -> Result<(), String> {
    use nix::unistd::{setgid, setgroups, setuid, Group, User};

    if !nix::unistd::Uid::effective().is_root() {
        tracing::warn!("not started as root, cannot change user or group");
        return Ok(());
    }

    setgroups(&[]).map_err(|error| format!("setgroups: {error}"))?;

    if let Some(name) = group {
        let group = Group::from_name(name)
            .map_err(|error| format!("could not look up group '{name}': {error}"))?
            .ok_or_else(|| format!("no such group '{name}'"))?;
        setgid(group.gid).map_err(|error| format!("setgid: {error}"))?;
    }

    if let Some(name) = user {
        let user = User::from_name(name)
            .map_err(|error| format!("could not look up user '{name}': {error}"))?
            .ok_or_else(|| format!("no such user '{name}'"))?;
        setuid(user.uid).map_err(|error| format!("setuid: {error}"))?;
    }

    Ok(())
}

fn begin_logging() {
    use tracing_subscriber::EnvFilter;

    let log_format = if let Ok(var) = env::var("RUST_LOG_FORMAT") {
        var.split(',').map(str::to_string).collect()
    } else {
        HashSet::new()
    };

    let logger = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_ansi(!log_format.contains("no-ansi"));

    if log_format.contains("json") {
        if log_format.contains("no-time") {
            logger.json().without_time().init();
        } else {
            logger.json().init();
        }
    } else if log_format.contains("compact") {
        if log_format.contains("no-time") {
            logger.compact().without_time().init();
        } else {
            logger.compact().init();
        }
    } else if log_format.contains("no-time") {
        logger.without_time().init();
    } else {
        logger.init();
    }
}

// the doc comments for this struct turn into the CLI help text
#[derive(Debug, Clone, Parser)]
/// An authoritative-only DNS server.
///
/// zoned answers queries for the zones named in its configuration
/// file, per the RFC 1034 algorithm with CNAME chaining, DNAME
/// substitution, wildcards, delegations, and EDNS(0).  It does not
/// recurse, cache, or transfer zones.
///
/// SIGHUP reloads all zone files; SIGTERM exits.
///
/// Prometheus metrics are served at
/// "http://{metrics_interface}:{metrics_port}/metrics"
struct Args {
    /// Configuration file naming the zones to serve
    #[clap(short, long, value_parser, default_value = "zoned.yaml")]
    config: String,

    /// Interface to listen on (overrides the configuration file)
    #[clap(short = 's', long, value_parser)]
    interface: Option<IpAddr>,

    /// Port to listen on (overrides the configuration file)
    #[clap(short, long, value_parser)]
    port: Option<u16>,

    /// Max EDNS UDP payload in octets for responses we send out; 0
    /// disables EDNS (overrides the configuration file)
    #[clap(short, long, value_parser)]
    edns_udp_max: Option<u16>,

    /// Interface to listen on to serve Prometheus metrics
    #[clap(long, value_parser, default_value_t = Ipv4Addr::LOCALHOST)]
    metrics_interface: Ipv4Addr,

    /// Port to listen on to serve Prometheus metrics
    #[clap(long, value_parser, default_value_t = 9420)]
    metrics_port: u16,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    begin_logging();

    let settings = match Settings::new(&args.config) {
        Ok(settings) => settings,
        Err(error) => {
            tracing::error!(config = %args.config, %error, "could not read configuration file");
            process::exit(1);
        }
    };
    if settings.zones.is_empty() {
        tracing::error!("no zones defined");
        process::exit(1);
    }

    let zones = match load_zones(&settings).await {
        Some(zones) => zones,
        None => {
            tracing::error!("could not load zones");
            process::exit(1);
        }
    };
    tracing::info!(zones = %zones.len(), "loaded zones");

    let interface = args
        .interface
        .or(settings.interface)
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
    let port = args.port.unwrap_or(settings.port);
    let policy = ResponsePolicy {
        edns_udp_max: args.edns_udp_max.unwrap_or(settings.edns_udp_max),
        edns_udp_advertised: DEFAULT_EDNS_UDP_ADVERTISED,
    };

    tracing::info!(%interface, %port, "binding DNS UDP socket");
    let udp = match UdpSocket::bind((interface, port)).await {
        Ok(socket) => socket,
        Err(error) => {
            tracing::error!(?error, "could not bind DNS UDP socket");
            process::exit(1);
        }
    };

    tracing::info!(%interface, %port, "binding DNS TCP socket");
    let tcp = match TcpListener::bind((interface, port)).await {
        Ok(listener) => listener,
        Err(error) => {
            tracing::error!(?error, "could not bind DNS TCP socket");
            process::exit(1);
        }
    };

    if settings.user.is_some() || settings.group.is_some() {
        if let Err(error) =
            drop_privileges(settings.user.as_deref(), settings.group.as_deref())
        {
            tracing::error!(%error, "could not drop privileges");
            process::exit(1);
        }
    }

    let listen_args = ListenArgs {
        zones: Arc::new(RwLock::new(Arc::new(zones))),
        policy,
    };

    tokio::spawn(listen_tcp_task(listen_args.clone(), tcp));
    tokio::spawn(listen_udp_task(listen_args.clone(), udp));
    tokio::spawn(reload_task(listen_args.zones.clone(), settings.clone()));
    tokio::spawn(shutdown_task());

    let metrics_address = SocketAddr::from((args.metrics_interface, args.metrics_port));
    tracing::info!(address = %metrics_address, "binding HTTP TCP socket");
    if let Err(error) = serve_prometheus_endpoint_task(metrics_address).await {
        tracing::error!(?error, "could not bind HTTP TCP socket");
        process::exit(1);
    }
}
