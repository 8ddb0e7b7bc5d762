use ferry::middleware::{AccessLog, Compress};
use ferry::{handler_fn, Context, Ferry, HandlerResult, Routes, ServerError, StatusCode};
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Deserialize, Debug, garde::Validate)]
struct Login {
    #[garde(length(min = 1))]
    username: String,
    #[garde(length(min = 1))]
    password: String,
}

// curl -v http://127.0.0.1:3000/
async fn hello(ctx: &mut Context) -> HandlerResult {
    ctx.send(StatusCode::OK, "Hello, World")?;
    Ok(())
}

async fn redirect(ctx: &mut Context) -> HandlerResult {
    ctx.redirect(StatusCode::TEMPORARY_REDIRECT, "http://localhost:3000/static")?;
    Ok(())
}

// curl -v http://127.0.0.1:3000/name/madhuri
async fn name(ctx: &mut Context) -> HandlerResult {
    let name = ctx.param("name").unwrap_or_default().to_owned();
    ctx.send(StatusCode::OK, format!("hello, {name}"))?;
    Ok(())
}

// curl -v -H 'Content-Type: application/json' -d '{"username":"madhuri","password":"secret"}' http://127.0.0.1:3000/login
async fn login(ctx: &mut Context) -> HandlerResult {
    let login: Login = ctx.bind().await?;
    let message = HashMap::from([("message", format!("Welcome {}", login.username))]);
    ctx.json(StatusCode::OK, &message)?;
    Ok(())
}

async fn download(ctx: &mut Context) -> HandlerResult {
    ctx.send_attachment("static/login.js", "login.js").await?;
    Ok(())
}

// curl -v -F 'login.js=@static/login.js' http://127.0.0.1:3000/upload
async fn upload(ctx: &mut Context) -> HandlerResult {
    ctx.upload_file("static/login.js", "login.js").await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    let mut app = Ferry::new();
    app.use_middleware(AccessLog);

    app.get("/", handler_fn(hello))
        .get("/redirect", handler_fn(redirect))
        .get("/name/:name", handler_fn(name))
        .post("/login", handler_fn(login))
        .get("/download", handler_fn(download))
        .post("/upload", handler_fn(upload));

    {
        let mut auth = app.group("/auth");
        auth.use_middleware(Compress);
        auth.get("/login", handler_fn(hello));
    }

    app.serve_dir("/static", "static");
    app.serve_file("/js", "static/login.js");

    app.listen("127.0.0.1:3000").await
}
