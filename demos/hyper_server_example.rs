use std::{convert::Infallible, net::SocketAddr};

use bytes::Bytes;
use futures_util::StreamExt;
use http_body_util::{BodyStream, Full};
use hyper::{body::Incoming, header::CONTENT_TYPE, Request, Response, StatusCode};
// Import the formparts types.
use formparts::{Constraints, Multipart, SizeLimit};

// A handler for incoming requests.
async fn handle(req: Request<Incoming>) -> Result<Response<Full<Bytes>>, Infallible> {
    // Extract the `multipart/form-data` boundary from the headers.
    let boundary = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|ct| ct.to_str().ok())
        .and_then(formparts::extract_boundary);

    // Send `BAD_REQUEST` status if the content-type has no boundary.
    let boundary = match boundary {
        Some(boundary) => boundary,
        None => {
            return Ok(Response::builder()
                .status(StatusCode::BAD_REQUEST)
                .body(Full::from("BAD REQUEST"))
                .unwrap());
        }
    };

    // Process the multipart e.g. you can store them in files.
    if let Err(err) = process_multipart(req.into_body(), boundary).await {
        return Ok(Response::builder()
            .status(StatusCode::BAD_REQUEST)
            .body(Full::from(format!("BAD REQUEST: {}", err)))
            .unwrap());
    }

    Ok(Response::new(Full::from("Success")))
}

// Process the request body as multipart/form-data.
async fn process_multipart(body: Incoming, boundary: String) -> formparts::Result<()> {
    // Convert the body into a stream of data frames.
    let body_stream = BodyStream::new(body)
        .filter_map(|result| async move { result.map(|frame| frame.into_data().ok()).transpose() });

    // Cap the request body before it is buffered.
    let constraints = Constraints::new().size_limit(SizeLimit::new().whole_stream(16 * 1024 * 1024));

    // Collect the request body and decode it.
    let form = Multipart::from_stream_with_constraints(body_stream, &boundary, constraints).await?;

    for part in &form {
        println!(
            "Name: {:?}, FileName: {:?}, Content-Type: {:?}",
            part.name(),
            part.file_name(),
            part.content_type()
        );

        println!("Part Bytes Length: {:?}", part.data().len());
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let addr = SocketAddr::from(([127, 0, 0, 1], 3000));
    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    println!("Server running at: {}", addr);

    let service = hyper::service::service_fn(handle);

    loop {
        let (socket, _remote_addr) = listener.accept().await.unwrap();
        let socket = hyper_util::rt::TokioIo::new(socket);
        tokio::spawn(async move {
            if let Err(e) = hyper::server::conn::http1::Builder::new()
                .serve_connection(socket, service)
                .await
            {
                eprintln!("server error: {}", e);
            }
        });
    }
}
