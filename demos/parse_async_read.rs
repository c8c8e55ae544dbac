use tokio::io::AsyncRead;
// Import formparts types.
use formparts::Multipart;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Generate an `AsyncRead` and the boundary from somewhere e.g. server request body.
    let (reader, boundary) = get_async_reader_from_somewhere().await;

    // Read it to its end and decode the parts.
    let form = Multipart::with_reader(reader, boundary).await?;

    for part in form {
        // Get the field name and the file name, if provided in "Content-Disposition" header.
        println!("Name: {:?}, File Name: {:?}", part.name(), part.file_name());

        // Read part content as text.
        println!("Content: {:?}", part.text());
    }

    Ok(())
}

// Generate an `AsyncRead` and the boundary from somewhere e.g. server request body.
async fn get_async_reader_from_somewhere() -> (impl AsyncRead + Send + 'static, &'static str) {
    let data = "--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"My Field\"\r\n\r\nabcd\r\n--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"File Field\"; filename=\"a-text-file.txt\"\r\nContent-Type: text/plain\r\n\r\nHello world\nHello\r\nWorld\rAgain\r\n--X-BOUNDARY--\r\n";

    (data.as_bytes(), "X-BOUNDARY")
}
