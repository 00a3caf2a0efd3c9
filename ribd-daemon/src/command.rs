//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::collections::VecDeque;
use std::net::Ipv4Addr;
use std::str::FromStr;

use ipnetwork::IpNetwork;
use ribd_routing::Master;
use ribd_routing::error::Error as RibError;
use ribd_routing::northbound::state::ShowRouteArgs;
use ribd_routing::show::OutputFormat;
use ribd_routing::show::filter::FilterCriterion;
use ribd_routing::show::summary::SummaryMode;
use ribd_routing::static_route::StaticRouteArgs;
use ribd_routing::vrf::{VRF_DEFAULT_NAME, VrfSelector};
use ribd_utils::ip::{AddressFamily, IpNetworkExt, Safi};

use crate::error::{Error, ParserError};

type Tokens<'a> = VecDeque<&'a str>;

// Keywords introducing the optional attributes of a static route.
const STATIC_ROUTE_KEYWORDS: [&str; 3] = ["tag", "vrf", "label"];

// ===== global functions =====

pub(crate) fn normalize_input_line(line: &str) -> Option<String> {
    // Ignore "!" comments.
    let line = line.split('!').next()?;

    // Remove redundant whitespaces.
    let line = line.split_whitespace().collect::<Vec<_>>().join(" ");

    // Handle empty input.
    if line.is_empty() {
        return None;
    }

    Some(line)
}

// Executes one command in canonical form and returns its output.
pub(crate) fn execute(
    master: &mut Master,
    line: &str,
) -> Result<String, Error> {
    let mut tokens = line.split_whitespace().collect::<Tokens<'_>>();

    // Check for negation commands.
    let negate = tokens.front() == Some(&"no");
    if negate {
        tokens.pop_front();
    }

    let mut output = String::new();
    match next(&mut tokens)? {
        "show" if !negate => output = show(master, &mut tokens)?,
        "ip" => ip_config(master, AddressFamily::Ipv4, negate, &mut tokens)?,
        "ipv6" => ip_config(master, AddressFamily::Ipv6, negate, &mut tokens)?,
        "allow-external-route-update" => {
            master.allow_external_route_update_set(!negate);
        }
        "vrf" => vrf_config(master, negate, &mut tokens)?,
        "interface" => interface_config(master, negate, &mut tokens)?,
        _ => return Err(ParserError::NoMatch.into()),
    }

    // Trailing input isn't accepted.
    if !tokens.is_empty() {
        return Err(ParserError::NoMatch.into());
    }

    Ok(output)
}

// ===== helper functions =====

fn ip_config(
    master: &mut Master,
    af: AddressFamily,
    negate: bool,
    tokens: &mut Tokens<'_>,
) -> Result<(), Error> {
    match (af, next(tokens)?) {
        (_, "route") => {
            let args = static_route_args(af, Safi::Unicast, negate, tokens)?;
            master.configure_static_route(&args)?;
        }
        (AddressFamily::Ipv4, "mroute") => {
            let args = static_route_args(af, Safi::Multicast, negate, tokens)?;
            master.configure_static_route(&args)?;
        }
        (_, "nht") => {
            keyword(tokens, "resolve-via-default")?;
            master.nht_resolve_via_default_set(af, !negate);
        }
        (AddressFamily::Ipv4, "import-table") => {
            let table_id = number::<u32>(next(tokens)?)?;
            if negate {
                // The optional arguments don't select anything.
                tokens.clear();
                master.import_table_unset(table_id)?;
                return Ok(());
            }

            let mut distance = None;
            let mut route_map = None;
            while let Some(token) = tokens.pop_front() {
                match token {
                    "distance" => {
                        let value = next(tokens)?;
                        match number::<u8>(value)? {
                            0 => {
                                return Err(ParserError::InvalidArgument(
                                    value.to_owned(),
                                )
                                .into());
                            }
                            value => distance = Some(value),
                        }
                    }
                    "route-map" => route_map = Some(next(tokens)?.to_owned()),
                    _ => return Err(ParserError::NoMatch.into()),
                }
            }
            master.import_table_set(table_id, distance, route_map)?;
        }
        (AddressFamily::Ipv4, "multicast") => {
            keyword(tokens, "rpf-lookup-mode")?;
            if negate {
                tokens.pop_front();
                master.multicast_mode_unset();
            } else {
                master.multicast_mode_set(next(tokens)?)?;
            }
        }
        _ => return Err(ParserError::NoMatch.into()),
    }

    Ok(())
}

// Splits a static route command into its raw arguments. Validation is left
// to the static route normalizer.
//
// Syntax: PREFIX [MASK] [from SRC] <GATEWAY [IFNAME]|IFNAME|FLAG> [FLAG]
// [tag TAG] [DISTANCE] [vrf NAME] [label LABELS]
fn static_route_args(
    af: AddressFamily,
    safi: Safi,
    negate: bool,
    tokens: &mut Tokens<'_>,
) -> Result<StaticRouteArgs, Error> {
    let dest = next(tokens)?;
    let mut args = StaticRouteArgs::new(af, safi, dest);
    args.negate = negate;

    // Address and mask form.
    if af == AddressFamily::Ipv4
        && !dest.contains('/')
        && tokens.len() >= 2
        && tokens[0].parse::<Ipv4Addr>().is_ok()
        && is_nexthop_token(tokens[1])
    {
        args.mask = tokens.pop_front().map(str::to_owned);
    }

    // Source prefix.
    if af == AddressFamily::Ipv6 && tokens.front() == Some(&"from") {
        tokens.pop_front();
        args.src = Some(next(tokens)?.to_owned());
    }

    // Nexthop.
    let token = next(tokens)?;
    if is_flag(token) {
        args.flag = Some(token.to_owned());
    } else {
        if is_address(token) {
            args.gateway = Some(token.to_owned());
            if let Some(ifname) = tokens.front().copied()
                && is_nexthop_token(ifname)
                && !is_flag(ifname)
            {
                tokens.pop_front();
                args.ifname = Some(ifname.to_owned());
            }
        } else {
            args.ifname = Some(token.to_owned());
        }
        if let Some(flag) = tokens.front().copied()
            && is_flag(flag)
        {
            tokens.pop_front();
            args.flag = Some(flag.to_owned());
        }
    }

    // Optional attributes.
    while let Some(token) = tokens.pop_front() {
        match token {
            "tag" => args.tag = Some(next(tokens)?.to_owned()),
            "vrf" => args.vrf = Some(next(tokens)?.to_owned()),
            "label" => args.labels = Some(next(tokens)?.to_owned()),
            _ if is_number(token) => args.distance = Some(token.to_owned()),
            _ => return Err(ParserError::NoMatch.into()),
        }
    }

    Ok(args)
}

fn vrf_config(
    master: &mut Master,
    negate: bool,
    tokens: &mut Tokens<'_>,
) -> Result<(), Error> {
    let name = next(tokens)?;
    if negate {
        master.vrf_delete(name)?;
        return Ok(());
    }

    match next(tokens)? {
        "table" => master.vrf_add(name, number(next(tokens)?)?),
        "enable" => master.vrf_enable(name, number(next(tokens)?)?)?,
        "disable" => master.vrf_disable(name)?,
        _ => return Err(ParserError::NoMatch.into()),
    }
    Ok(())
}

fn interface_config(
    master: &mut Master,
    negate: bool,
    tokens: &mut Tokens<'_>,
) -> Result<(), Error> {
    let ifname = next(tokens)?;
    let mut vrf = VRF_DEFAULT_NAME;
    let mut ifindex = None;
    let mut addresses = vec![];
    while let Some(token) = tokens.pop_front() {
        match token {
            "vrf" => vrf = next(tokens)?,
            "ifindex" if !negate => ifindex = Some(number(next(tokens)?)?),
            "address" if !negate => {
                let addr = next(tokens)?;
                let addr = addr
                    .parse::<IpNetwork>()
                    .map_err(|_| RibError::MalformedAddress(addr.to_owned()))?;
                addresses.push(addr);
            }
            _ => return Err(ParserError::NoMatch.into()),
        }
    }

    if negate {
        master.interface_del(vrf, ifname)?;
    } else {
        let ifindex = ifindex.ok_or(ParserError::Incomplete)?;
        master.interface_add(vrf, ifname, ifindex, &addresses)?;
    }
    Ok(())
}

fn show(master: &Master, tokens: &mut Tokens<'_>) -> Result<String, Error> {
    match next(tokens)? {
        "ip" => show_ip(master, AddressFamily::Ipv4, tokens),
        "ipv6" => show_ip(master, AddressFamily::Ipv6, tokens),
        "vrf" => Ok(master.show_vrf()),
        "running-config" => Ok(master.config_write()),
        _ => Err(ParserError::NoMatch.into()),
    }
}

fn show_ip(
    master: &Master,
    af: AddressFamily,
    tokens: &mut Tokens<'_>,
) -> Result<String, Error> {
    let output = match (af, next(tokens)?) {
        (_, scope @ ("route" | "fib")) => {
            return show_route(master, af, scope == "fib", tokens);
        }
        (_, "nht") => {
            let selector = vrf_selector(tokens)?;
            master.show_nht(af, &selector)?
        }
        (AddressFamily::Ipv4, "rpf") => match tokens.pop_front() {
            None => master.show_rpf(OutputFormat::Text)?,
            Some("json") => master.show_rpf(OutputFormat::Json)?,
            Some(addr) => master.show_rpf_at(addr)?,
        },
        (AddressFamily::Ipv6, "mroute") => {
            let selector = vrf_selector(tokens)?;
            master.show_ipv6_mroute(&selector)?
        }
        _ => return Err(ParserError::NoMatch.into()),
    };
    Ok(output)
}

// Syntax: [vrf NAME|all] [summary [prefix]|ADDRESS|PREFIX] [FILTER] [json]
fn show_route(
    master: &Master,
    af: AddressFamily,
    fib_only: bool,
    tokens: &mut Tokens<'_>,
) -> Result<String, Error> {
    let mut args = ShowRouteArgs::new(af);
    args.vrf = vrf_selector(tokens)?;
    args.filter.fib_only = fib_only;

    while let Some(token) = tokens.pop_front() {
        match token {
            "json" => args.format = OutputFormat::Json,
            "summary" => {
                let mode = match tokens.pop_front() {
                    None => SummaryMode::PerRoute,
                    Some("prefix") => SummaryMode::PerPrefix,
                    Some(_) => return Err(ParserError::NoMatch.into()),
                };
                return Ok(master.show_route_summary(af, &args.vrf, mode)?);
            }
            "tag" => {
                let tag = number(next(tokens)?)?;
                args.filter.criterion = Some(FilterCriterion::Tag(tag));
            }
            "supernets-only" if af == AddressFamily::Ipv4 => {
                args.filter.criterion = Some(FilterCriterion::SupernetsOnly);
            }
            "ospf"
                if af == AddressFamily::Ipv4
                    && tokens.front().is_some_and(|token| is_number(token)) =>
            {
                args.filter.ospf_instance = Some(number(next(tokens)?)?);
            }
            _ if is_address(token) => {
                if tokens.front() != Some(&"longer-prefixes") {
                    return Ok(master.show_route_at(af, &args.vrf, token)?);
                }
                tokens.pop_front();
                let prefix = IpNetwork::parse_af(af, token).ok_or_else(|| {
                    RibError::MalformedQueryAddress(af, token.to_owned())
                })?;
                args.filter.criterion =
                    Some(FilterCriterion::LongerPrefix(prefix));
            }
            _ => {
                args.filter.criterion =
                    Some(FilterCriterion::protocol(af, token)?);
            }
        }
    }

    Ok(master.show_route(&args)?)
}

fn vrf_selector(tokens: &mut Tokens<'_>) -> Result<VrfSelector, Error> {
    if tokens.front() != Some(&"vrf") {
        return Ok(VrfSelector::Default);
    }
    tokens.pop_front();
    let name = next(tokens)?;
    Ok(VrfSelector::from_arg(Some(name)))
}

fn next<'a>(tokens: &mut Tokens<'a>) -> Result<&'a str, ParserError> {
    tokens.pop_front().ok_or(ParserError::Incomplete)
}

fn keyword(tokens: &mut Tokens<'_>, keyword: &str) -> Result<(), ParserError> {
    match tokens.pop_front() {
        Some(token) if token == keyword => Ok(()),
        Some(_) => Err(ParserError::NoMatch),
        None => Err(ParserError::Incomplete),
    }
}

fn number<T: FromStr>(token: &str) -> Result<T, ParserError> {
    token
        .parse::<T>()
        .map_err(|_| ParserError::InvalidArgument(token.to_owned()))
}

fn is_number(token: &str) -> bool {
    !token.is_empty() && token.chars().all(|c| c.is_ascii_digit())
}

fn is_address(token: &str) -> bool {
    token.starts_with(|c: char| c.is_ascii_digit()) || token.contains(':')
}

fn is_flag(token: &str) -> bool {
    token.eq_ignore_ascii_case("reject") || token.eq_ignore_ascii_case("blackhole")
}

fn is_nexthop_token(token: &str) -> bool {
    !STATIC_ROUTE_KEYWORDS.contains(&token) && !is_number(token)
}

// ===== unit tests =====
