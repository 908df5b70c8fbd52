//! Local HTTP server for browser tests
//!
//! Serves a small storefront page so capture can be tested in a real Chrome
//! without relying on external websites. Each instance binds a random port.

use std::net::SocketAddr;
use tokio::sync::oneshot;
use warp::Filter;

pub const SHOP_HTML: &str = r#"<!DOCTYPE html>
<html lang="tr">
<head>
    <title>Mağaza</title>
    <style>
        body { margin: 0; font: 14px sans-serif; }
        .productCard { position: relative; width: 200px; height: 200px; }
        .productCard__img { display: block; width: 200px; height: 150px; }
        .cover { position: absolute; left: 0; top: 0; width: 200px; height: 150px; }
        #submit-btn { position: absolute; left: 300px; top: 10px; width: 80px; height: 30px; }
    </style>
</head>
<body>
    <header class="site-header">
        <nav class="main-nav">
            <a class="nav-link" href="/giris">Giriş</a>
            <a class="nav-link" href="/sepet">Sepetim</a>
        </nav>
    </header>
    <div class="search-box">
        <input name="q" type="text" value="running shoes">
        <button id="submit-btn" class="btn primary" onclick="document.title = 'searched'">Ara</button>
    </div>
    <ul class="product-list">
        <li class="product-item"><div class="productCard">
            <img class="productCard__img lazy" alt="">
            <div class="cover"></div>
        </div></li>
    </ul>
    <span class="badge">Yeni</span>
    <script>
        document.querySelector('.badge').addEventListener('click', () => {});
    </script>
</body>
</html>"#;

pub struct TestServer {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl TestServer {
    /// Start a new test server on a random available port
    pub async fn start() -> Self {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let index = warp::path::end().map(|| warp::reply::html(SHOP_HTML));

        let (addr, server) =
            warp::serve(index).bind_with_graceful_shutdown(([127, 0, 0, 1], 0), async {
                shutdown_rx.await.ok();
            });
        tokio::spawn(server);

        Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Base URL, e.g. "http://127.0.0.1:12345"
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Wait until the server accepts connections
    pub async fn wait_ready(&self) -> anyhow::Result<()> {
        let max_attempts = 10;

        for attempt in 1..=max_attempts {
            match tokio::net::TcpStream::connect(self.addr).await {
                Ok(_) => {
                    println!("✅ Test server ready on: {}", self.url());
                    return Ok(());
                }
                Err(e) => println!("⚠️ Attempt {}: Server not ready - {}", attempt, e),
            }
            if attempt < max_attempts {
                tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
            }
        }

        anyhow::bail!("Server did not become ready after {} attempts", max_attempts)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
