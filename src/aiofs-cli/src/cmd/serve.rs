use std::{
    io::{self, BufRead, BufReader, Write},
    net::{TcpListener, TcpStream},
    path::{Component, Path, PathBuf},
    sync::Arc,
    thread,
};

use aiofs::{Error, Executor, File, OpenFlags};
use clap::Args;
use eyre::Context;

use super::Command;

const INDEX: &str = "index.html";

/// Subcommand for serving a directory over HTTP.
///
/// Every connection gets its own thread, but all file I/O is carried
/// out by the executor's workers.
#[derive(Debug, Args)]
pub struct Serve {
    /// The directory to serve files from.
    root: PathBuf,

    /// The address to listen on.
    #[clap(short, long, default_value = "127.0.0.1:1337")]
    addr: String,
}

impl Command for Serve {
    fn handle(self, ex: Arc<Executor>) -> eyre::Result<()> {
        if !self.root.is_dir() {
            eyre::bail!("root to serve must be a directory");
        }

        let listener = TcpListener::bind(&self.addr)
            .with_context(|| format!("failed to listen on '{}'", self.addr))?;
        log::info!("Serving '{}' on {}", self.root.display(), self.addr);

        let root: Arc<Path> = self.root.into();
        for stream in listener.incoming() {
            let stream = match stream {
                Ok(stream) => stream,
                Err(e) => {
                    log::warn!("Failed to accept connection: {e}");
                    continue;
                }
            };

            let ex = ex.clone();
            let root = root.clone();
            thread::spawn(move || {
                if let Err(e) = serve_connection(&ex, &root, stream) {
                    log::debug!("Connection failed: {e}");
                }
            });
        }

        Ok(())
    }
}

fn serve_connection(ex: &Executor, root: &Path, mut stream: TcpStream) -> io::Result<()> {
    let mut reader = BufReader::new(stream.try_clone()?);

    let mut request_line = String::new();
    reader.read_line(&mut request_line)?;

    // We don't care about any of the headers.
    let mut header = String::new();
    loop {
        header.clear();
        if reader.read_line(&mut header)? == 0 || header.trim().is_empty() {
            break;
        }
    }

    let mut parts = request_line.split_whitespace();
    let (Some(method), Some(target)) = (parts.next(), parts.next()) else {
        return respond_status(&mut stream, 400, "Bad Request");
    };
    log::debug!("{method} {target}");

    if method != "GET" {
        return respond_status(&mut stream, 405, "Method Not Allowed");
    }
    let Some(path) = resolve(root, target) else {
        return respond_status(&mut stream, 404, "Not Found");
    };

    let file = match ex.open(&path, OpenFlags::READ, 0) {
        Ok(file) => file,
        Err(Error::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
            return respond_status(&mut stream, 404, "Not Found");
        }
        Err(e) => {
            log::warn!("Failed to open '{}': {e}", path.display());
            return respond_status(&mut stream, 500, "Internal Server Error");
        }
    };

    let result = send_file(&file, &mut stream);
    if let Err(e) = file.close() {
        log::warn!("Failed to close '{}': {e}", path.display());
    }

    result
}

fn send_file(file: &File, stream: &mut TcpStream) -> io::Result<()> {
    let meta = file.stat()?;
    if !meta.is_file() {
        return respond_status(stream, 404, "Not Found");
    }

    write!(
        stream,
        "HTTP/1.0 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        meta.len()
    )?;
    io::copy(&mut &*file, stream)?;

    stream.flush()
}

fn respond_status(stream: &mut TcpStream, code: u16, reason: &str) -> io::Result<()> {
    write!(
        stream,
        "HTTP/1.0 {code} {reason}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{reason}",
        reason.len()
    )?;

    stream.flush()
}

/// Maps a request target to a path below `root`.
///
/// Targets which try to escape `root` are rejected.
fn resolve(root: &Path, target: &str) -> Option<PathBuf> {
    let target = target.split(['?', '#']).next()?;

    let mut path = root.to_path_buf();
    for component in Path::new(target.trim_start_matches('/')).components() {
        match component {
            Component::Normal(part) => path.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }

    if path.as_path() == root {
        path.push(INDEX);
    }

    Some(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_targets() {
        let root = Path::new("/srv/www");

        assert_eq!(
            resolve(root, "/docs/a.txt?x=1"),
            Some(PathBuf::from("/srv/www/docs/a.txt"))
        );
        assert_eq!(resolve(root, "/"), Some(PathBuf::from("/srv/www/index.html")));
        assert_eq!(resolve(root, "/./b.txt"), Some(PathBuf::from("/srv/www/b.txt")));
        assert_eq!(resolve(root, "/../etc/passwd"), None);
        assert_eq!(resolve(root, "/docs/../../etc/passwd"), None);
    }
}
