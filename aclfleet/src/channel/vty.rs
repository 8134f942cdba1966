//! Interactive VTY channel over an SSH PTY.

use std::time::{Duration, Instant};

use log::{debug, trace};
use russh::client::Msg;
use russh::{Channel, ChannelMsg};

use super::buffer::PatternBuffer;
use super::profile::VtyProfile;
use crate::error::{ChannelError, Result};
use crate::session::Response;

/// Command/response stream to one device.
///
/// Every line written is followed by a read up to the next prompt, so
/// multi-line configuration text is fed to the device one line at a time.
pub struct VtyChannel {
    channel: Channel<Msg>,
    buffer: PatternBuffer,
    profile: VtyProfile,
    timeout: Duration,
}

impl VtyChannel {
    /// Wait for the first prompt and run the profile's on-open commands.
    pub async fn open(
        channel: Channel<Msg>,
        profile: VtyProfile,
        timeout: Duration,
    ) -> Result<Self> {
        let mut vty = Self {
            channel,
            buffer: PatternBuffer::new(profile.search_depth),
            profile,
            timeout,
        };

        let (_, prompt) = vty.read_until_prompt().await?;
        debug!("vty open, prompt {:?}", prompt);

        for command in vty.profile.on_open_commands.clone() {
            vty.send(&command).await?;
        }
        Ok(vty)
    }

    /// Write `text` line by line and collect the output.
    ///
    /// The response is marked failed when the output carries one of the
    /// profile's failure markers.
    pub async fn send(&mut self, text: &str) -> Result<Response> {
        let start = Instant::now();
        let mut result = String::new();
        let mut prompt = String::new();

        for line in text.lines().map(str::trim_end).filter(|l| !l.is_empty()) {
            self.write_line(line).await?;
            let (body, last) = self.read_until_prompt().await?;
            result.push_str(&strip_echo(&body, line));
            prompt = last;
        }

        let elapsed = start.elapsed();
        if let Some(marker) = self.profile.detect_failure(&result) {
            debug!("vty: failure marker {:?} in response to {:?}", marker, text);
            let marker = marker.to_string();
            return Ok(Response::new(text, result, prompt, elapsed).rejected(marker));
        }
        Ok(Response::new(text, result, prompt, elapsed))
    }

    /// Signal end of input and close the channel.
    pub async fn close(self) -> Result<()> {
        self.channel.eof().await.map_err(ChannelError::Ssh)?;
        self.channel.close().await.map_err(ChannelError::Ssh)?;
        Ok(())
    }

    async fn write_line(&mut self, line: &str) -> Result<()> {
        trace!("vty >> {:?}", line);
        let data = format!("{line}\n");
        self.channel
            .data(data.as_bytes())
            .await
            .map_err(ChannelError::Ssh)?;
        Ok(())
    }

    /// Read until the tail of the buffer matches the prompt pattern.
    /// Returns the output before the prompt line, and the trimmed prompt.
    async fn read_until_prompt(&mut self) -> Result<(String, String)> {
        let deadline = tokio::time::Instant::now() + self.timeout;

        loop {
            if self.buffer.tail_contains(&self.profile.prompt) {
                let (body, prompt) = self.buffer.take_prompted();
                return Ok((
                    String::from_utf8_lossy(&body).into_owned(),
                    String::from_utf8_lossy(&prompt).trim().to_string(),
                ));
            }

            let msg = tokio::time::timeout_at(deadline, self.channel.wait())
                .await
                .map_err(|_| ChannelError::PatternTimeout(self.timeout))?;

            match msg {
                Some(ChannelMsg::Data { data }) => {
                    trace!("vty << {} bytes", data.len());
                    self.buffer.extend(&data);
                }
                Some(ChannelMsg::ExtendedData { data, .. }) => self.buffer.extend(&data),
                Some(ChannelMsg::Eof) | Some(ChannelMsg::Close) | None => {
                    return Err(ChannelError::Closed.into());
                }
                Some(other) => trace!("vty: ignoring {:?}", other),
            }
        }
    }
}

/// Drop the device's echo of `command` from the start of `body`.
fn strip_echo(body: &str, command: &str) -> String {
    let mut lines = body.lines();
    let mut out = Vec::new();

    if let Some(first) = lines.next() {
        if !first.trim_end().ends_with(command) {
            out.push(first.trim_end());
        }
    }
    out.extend(lines.map(str::trim_end));

    let mut text = out.join("\n");
    if !text.is_empty() {
        text.push('\n');
    }
    text
}
