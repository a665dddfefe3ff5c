use std::sync::Arc;

use futures_util::StreamExt;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};
use tokio::time::timeout;
use tracing::{error, info, warn};

use crate::catalog::Catalog;
use crate::catalog::details::DetailAssembler;
use crate::catalog::search::{SearchFilters, build_search_query, format_row};
use crate::config::ServerConfig;
use crate::error::{Fault, ProtocolFault};
use crate::protocol::{self, Command};

/// Serves one accepted connection end-to-end: one command, one response,
/// then the socket closes. Faults never leave this function; anything the
/// request flows did not already report is transport-level and logged here.
pub async fn handle_connection<S>(stream: S, catalog: Arc<Catalog>, config: Arc<ServerConfig>)
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    if let Err(fault) = serve_request(stream, &catalog, &config).await {
        warn!("{fault}");
    }
}

async fn serve_request<S>(stream: S, catalog: &Catalog, config: &ServerConfig) -> Result<(), Fault>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let (reader, mut writer) = tokio::io::split(stream);
    let mut reader = BufReader::new(reader);

    let Some(line) = read_request_line(&mut reader, config).await? else {
        // peer connected and left without issuing a command
        return Ok(());
    };
    match Command::parse(&line) {
        Some(Command::Submit) => submit(&mut reader, &mut writer, catalog, config).await,
        Some(Command::Details) => details(&mut reader, &mut writer, catalog, config).await,
        None => {
            // no response line for these, the close is the answer
            warn!("unrecognized command {line:?}");
            Ok(())
        }
    }
}

async fn submit<R, W>(
    reader: &mut BufReader<R>,
    writer: &mut W,
    catalog: &Catalog,
    config: &ServerConfig,
) -> Result<(), Fault>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    // fields arrive in wire order and keep their whitespace; only the
    // newline is framing
    let filters = SearchFilters {
        dept: read_argument_line(reader, config).await?,
        num: read_argument_line(reader, config).await?,
        area: read_argument_line(reader, config).await?,
        title: read_argument_line(reader, config).await?,
    };
    info!(
        "submit dept={:?} num={:?} area={:?} title={:?}",
        filters.dept, filters.num, filters.area, filters.title,
    );

    let (sql, params) = build_search_query(&filters);
    let mut rows = catalog.search(&sql, &params);
    while let Some(row) = rows.next().await {
        match row {
            Ok(row) => write_response_line(writer, &format_row(&row), config).await?,
            Err(e) => {
                error!("class search failed: {e}");
                // rows already flushed stay on the wire; the trailing
                // sentinel tells the client to discard them
                return write_response_line(writer, protocol::SYSTEM_ERROR, config).await;
            }
        }
    }
    Ok(())
}

async fn details<R, W>(
    reader: &mut BufReader<R>,
    writer: &mut W,
    catalog: &Catalog,
    config: &ServerConfig,
) -> Result<(), Fault>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let class_id = read_argument_line(reader, config).await?.trim().to_owned();
    info!("details classid={class_id:?}");

    let mut assembler = DetailAssembler::new(catalog, class_id);
    loop {
        match assembler.next_block().await {
            Ok(Some(lines)) => {
                for line in &lines {
                    write_response_line(writer, line, config).await?;
                }
            }
            Ok(None) => return Ok(()),
            Err(Fault::NoSuchClass(class_id)) => {
                info!("no class with id {class_id:?}");
                return write_response_line(writer, protocol::NO_CLASSID, config).await;
            }
            Err(fault) => {
                error!("class detail lookup failed: {fault}");
                return write_response_line(writer, protocol::SYSTEM_ERROR, config).await;
            }
        }
    }
}

async fn read_request_line<R>(
    reader: &mut BufReader<R>,
    config: &ServerConfig,
) -> Result<Option<String>, Fault>
where
    R: AsyncRead + Unpin,
{
    match timeout(config.read_timeout, protocol::read_line(reader)).await {
        Ok(result) => result,
        Err(_) => Err(ProtocolFault::ReadTimedOut(config.read_timeout).into()),
    }
}

/// Argument lines are mandatory; the peer hanging up early is a protocol
/// fault, not an empty field.
async fn read_argument_line<R>(
    reader: &mut BufReader<R>,
    config: &ServerConfig,
) -> Result<String, Fault>
where
    R: AsyncRead + Unpin,
{
    read_request_line(reader, config)
        .await?
        .ok_or(Fault::Protocol(ProtocolFault::UnexpectedEof))
}

async fn write_response_line<W>(
    writer: &mut W,
    line: &str,
    config: &ServerConfig,
) -> Result<(), Fault>
where
    W: AsyncWrite + Unpin,
{
    match timeout(config.write_timeout, protocol::write_line(writer, line)).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(ProtocolFault::WriteTimedOut(config.write_timeout).into()),
    }
}
