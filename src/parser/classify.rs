//! Line classifiers for every known log-line shape.
//!
//! Each line is split into a prefix, recognised with a regex, and a payload
//! matched against one [`Grammar`]. Lines that fit no grammar are ignored
//! by the readers; only the simulator banners are mandatory.

use std::sync::LazyLock;

use regex::Regex;

use super::grammar::{Fields, Grammar, Token};
use crate::error::ResultError;
use crate::results::{SimTime, TrafficCounters};
use crate::utils::duration::parse_duration;

/// Compiled prefix patterns
pub struct LinePrefixes {
    /// Match: "00:00:00.021258 [thread-0] <rest>"
    pub shadow: Regex,
    /// Match: "00:21:21.466 INFO  - file.cpp :398, func() ::   <payload>"
    pub newweb: Regex,
}

impl LinePrefixes {
    pub fn new() -> Self {
        Self {
            shadow: Regex::new(r"^[0-9:.]+ \[thread-[0-9]+\] (?P<rest>.*)$")
                .expect("Invalid shadow prefix regex"),
            newweb: Regex::new(
                r"^(?P<ts>[0-9:.]+) [A-Z0-9]+ +- .+? :\d+, .+?\(\) :: +(?P<payload>.*)$",
            )
            .expect("Invalid newweb prefix regex"),
        }
    }
}

impl Default for LinePrefixes {
    fn default() -> Self {
        Self::new()
    }
}

/// Global prefixes instance
pub static PREFIXES: LazyLock<LinePrefixes> = LazyLock::new(LinePrefixes::new);

const SHADOW_MESSAGE: &str = "n/a [shadow-message] [n/a] [";

// "[shd-master.c:143] [master_run] Shadow v1.11.2-3-g194f329 2016-10-04 (built 2016-11-11)"
pub const STARTUP_BANNER: Grammar = Grammar::new(
    "startup banner",
    &[
        Token::Lit(SHADOW_MESSAGE),
        Token::Text("location"),
        Token::Lit("] [master_run] Shadow "),
        Token::Text("release"),
    ],
);

// "[shd-master.c:153] [master_run] Shadow initialized at 2016-11-19 00:14:35 using GLib v2.48.1 ..."
pub const INIT_BANNER: Grammar = Grammar::new(
    "init banner",
    &[
        Token::Lit(SHADOW_MESSAGE),
        Token::Text("location"),
        Token::Lit("] [master_run] Shadow initialized at "),
        Token::Text("start_time"),
        Token::Lit(" using"),
        Token::Skip,
    ],
);

// "... [master_free] Shadow v1.11.2-3-g194f329 2016-10-04 (built 2016-11-11) shut down cleanly at 2016-11-19 03:31:09"
pub const SHUTDOWN_BANNER: Grammar = Grammar::new(
    "shutdown banner",
    &[
        Token::Skip,
        Token::AnyOf(&["[engine_free] Shadow ", "[master_free] Shadow "]),
        Token::Text("release"),
        Token::Lit(" shut down cleanly at "),
        Token::Text("completion_time"),
    ],
);

// "driver= 1: start loading page [www.wikipedia.org]"
pub const START_LOADING: Grammar = Grammar::new(
    "start loading",
    &[
        Token::Lit("driver= "),
        Token::Num("driver"),
        Token::Lit(": start loading page ["),
        Token::Text("url"),
        Token::Lit("]"),
    ],
);

// "driver= 1: DOM "load" event has fired; start waiting for more requests"
pub const DOM_LOAD_EVENT: Grammar = Grammar::new(
    "dom load event",
    &[
        Token::Lit("driver= "),
        Token::Num("driver"),
        Token::Lit(": DOM \"load\" event has fired; start waiting for more requests"),
    ],
);

// "loadnum= 3, webmode= vanilla, proxyMode= tor: loadResult= OK: startSec= 1281 plt= 2833
//  page= [www.wikipedia.org] ttfb= 824 numReqs= 7 numSuccess= 7 numFailed= 0
//  numAfterDOMLoadEvent= 2 numForced= 2"
pub const LOAD_RESULT: Grammar = Grammar::new(
    "load result",
    &[
        Token::Lit("loadnum= "),
        Token::Num("loadnum"),
        Token::Lit(", webmode= "),
        Token::Text("webmode"),
        Token::Lit(", proxyMode= "),
        Token::Text("proxymode"),
        Token::Lit(": loadResult= "),
        Token::Text("loadresult"),
        Token::Lit(": startSec= "),
        Token::Num("startsec"),
        Token::Lit(" plt= "),
        Token::Num("plt"),
        Token::Lit(" page= ["),
        Token::Text("url"),
        Token::Lit("] ttfb= "),
        Token::Num("ttfb"),
        Token::Lit(" numReqs= "),
        Token::Num("numreqs"),
        Token::Lit(" numSuccess= "),
        Token::Num("numsuccess"),
        Token::Lit(" numFailed= "),
        Token::Num("numfailed"),
        Token::Lit(" numAfterDOMLoadEvent= "),
        Token::Num("numafterdomload"),
        Token::Lit(" numForced= "),
        Token::Num("numforced"),
        Token::Skip,
    ],
);

// "cstp= 2: recv_so_far: all_bytes= 452250 useful_bytes= 337113 dummy_cells= 147 ;
//  send_so_far: all_bytes= 135000 useful_bytes= 5252 dummy_cells= 168 dummy_cells_avoided_so_far= 0"
pub const PERIODIC_STATS: Grammar = Grammar::new(
    "periodic stats",
    &[
        Token::Lit("cstp= "),
        Token::Num("cstp"),
        Token::Lit(": recv_so_far: all_bytes= "),
        Token::Num("recv_all_bytes"),
        Token::Lit(" useful_bytes= "),
        Token::Num("recv_useful_bytes"),
        Token::Lit(" dummy_cells= "),
        Token::Num("recv_dummy_cells"),
        Token::Lit(" ; send_so_far: all_bytes= "),
        Token::Num("send_all_bytes"),
        Token::Lit(" useful_bytes= "),
        Token::Num("send_useful_bytes"),
        Token::Lit(" dummy_cells= "),
        Token::Num("send_dummy_cells"),
        Token::Lit(" dummy_cells_avoided_so_far= "),
        Token::Num("avoided_send_dummy_cells"),
        Token::Skip,
    ],
);

// "csphandler= 4: with peer 11.0.2.10 recv: all_bytes= 75000 useful_bytes= 3698 dummy_cells= 91 ;
//  send: all_bytes= 300000 useful_bytes= 57227 dummy_cells= 319 dummy_cells_avoided= 0"
pub const HANDLER_STATS: Grammar = Grammar::new(
    "handler stats",
    &[
        Token::Lit("csphandler= "),
        Token::Num("csphandler"),
        Token::Lit(": with peer "),
        Token::Skip,
        Token::Lit(" recv: all_bytes= "),
        Token::Num("recv_all_bytes"),
        Token::Lit(" useful_bytes= "),
        Token::Num("recv_useful_bytes"),
        Token::Lit(" dummy_cells= "),
        Token::Num("recv_dummy_cells"),
        Token::Lit(" ; send: all_bytes= "),
        Token::Num("send_all_bytes"),
        Token::Lit(" useful_bytes= "),
        Token::Num("send_useful_bytes"),
        Token::Lit(" dummy_cells= "),
        Token::Num("send_dummy_cells"),
        Token::Lit(" dummy_cells_avoided= "),
        Token::Num("avoided_send_dummy_cells"),
        Token::Skip,
    ],
);

/// Simulator banner lines from `shadow.log`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShadowLine<'a> {
    Startup { release: &'a str },
    Init { start_time: &'a str },
    Shutdown {
        release: &'a str,
        completion_time: &'a str,
    },
}

pub fn classify_shadow_line(line: &str) -> Option<ShadowLine<'_>> {
    let caps = PREFIXES.shadow.captures(line)?;
    let rest = caps.name("rest")?.as_str();

    if let Some(fields) = SHUTDOWN_BANNER.try_match(rest) {
        return Some(ShadowLine::Shutdown {
            release: fields.get("release")?,
            completion_time: fields.get("completion_time")?,
        });
    }
    if let Some(fields) = INIT_BANNER.try_match(rest) {
        return Some(ShadowLine::Init {
            start_time: fields.get("start_time")?,
        });
    }
    let fields = STARTUP_BANNER.try_match(rest)?;
    Some(ShadowLine::Startup {
        release: fields.get("release")?,
    })
}

/// Fields of a page-load result line, unvalidated
#[derive(Debug, Clone, PartialEq)]
pub struct LoadReport<'a> {
    pub timestamp: SimTime,
    pub load_number: u32,
    pub web_mode: &'a str,
    pub proxy_mode: &'a str,
    pub load_result: &'a str,
    pub start_sec: u64,
    pub plt: u64,
    pub url: &'a str,
    pub ttfb: u64,
    pub num_requests: u32,
    pub num_success: u32,
    pub num_failed: u32,
    pub num_after_dom_load_event: u32,
    pub num_forced: u32,
}

/// Lines of a web client's driver log
#[derive(Debug, Clone, PartialEq)]
pub enum DriverLine<'a> {
    StartLoading { timestamp: SimTime, url: &'a str },
    DomLoadEvent { timestamp: SimTime },
    Result(LoadReport<'a>),
}

/// Lines of a transport proxy log
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProxyLine {
    /// Client-side running totals
    PeriodicStats {
        timestamp: SimTime,
        counters: TrafficCounters,
    },
    /// Exit-side totals of a destroyed handler
    HandlerStats {
        timestamp: SimTime,
        counters: TrafficCounters,
    },
}

/// Split a newweb line into its raw timestamp and payload.
///
/// The timestamp is left unparsed: only lines matching a grammar need it.
pub fn split_newweb_line(line: &str) -> Option<(&str, &str)> {
    let caps = PREFIXES.newweb.captures(line)?;
    let ts = caps.name("ts")?.as_str();
    let payload = caps.name("payload")?.as_str();
    Some((ts, payload))
}

pub fn classify_driver_line(line: &str) -> Result<Option<DriverLine<'_>>, ResultError> {
    let Some((ts, payload)) = split_newweb_line(line) else {
        return Ok(None);
    };

    if let Some(fields) = START_LOADING.try_match(payload) {
        return Ok(Some(DriverLine::StartLoading {
            timestamp: parse_duration(ts)?,
            url: fields.text("url")?,
        }));
    }
    if DOM_LOAD_EVENT.try_match(payload).is_some() {
        return Ok(Some(DriverLine::DomLoadEvent {
            timestamp: parse_duration(ts)?,
        }));
    }
    if let Some(fields) = LOAD_RESULT.try_match(payload) {
        return Ok(Some(DriverLine::Result(LoadReport {
            timestamp: parse_duration(ts)?,
            load_number: fields.num("loadnum")?,
            web_mode: fields.text("webmode")?,
            proxy_mode: fields.text("proxymode")?,
            load_result: fields.text("loadresult")?,
            start_sec: fields.num("startsec")?,
            plt: fields.num("plt")?,
            url: fields.text("url")?,
            ttfb: fields.num("ttfb")?,
            num_requests: fields.num("numreqs")?,
            num_success: fields.num("numsuccess")?,
            num_failed: fields.num("numfailed")?,
            num_after_dom_load_event: fields.num("numafterdomload")?,
            num_forced: fields.num("numforced")?,
        })));
    }
    Ok(None)
}

pub fn classify_proxy_line(line: &str) -> Result<Option<ProxyLine>, ResultError> {
    let Some((ts, payload)) = split_newweb_line(line) else {
        return Ok(None);
    };

    if let Some(fields) = PERIODIC_STATS.try_match(payload) {
        return Ok(Some(ProxyLine::PeriodicStats {
            timestamp: parse_duration(ts)?,
            counters: counters_from(&fields)?,
        }));
    }
    if let Some(fields) = HANDLER_STATS.try_match(payload) {
        return Ok(Some(ProxyLine::HandlerStats {
            timestamp: parse_duration(ts)?,
            counters: counters_from(&fields)?,
        }));
    }
    Ok(None)
}

fn counters_from(fields: &Fields<'_>) -> Result<TrafficCounters, ResultError> {
    Ok(TrafficCounters {
        recv_all_bytes: fields.num("recv_all_bytes")?,
        recv_useful_bytes: fields.num("recv_useful_bytes")?,
        recv_dummy_cells: fields.num("recv_dummy_cells")?,
        send_all_bytes: fields.num("send_all_bytes")?,
        send_useful_bytes: fields.num("send_useful_bytes")?,
        send_dummy_cells: fields.num("send_dummy_cells")?,
        avoided_send_dummy_cells: fields.num("avoided_send_dummy_cells")?,
    })
}
