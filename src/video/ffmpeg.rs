//! FFmpeg-backed video decode and encode.
//!
//! The source decodes a local file to packed RGB24 frames. The sink encodes
//! RGB24 frames as MPEG-4 Part 2 (codec tag "mp4v") in an MP4 container at
//! the source's resolution and frame rate. All processing is in-memory; the
//! only disk I/O is the input file and the output file.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use ffmpeg_next as ffmpeg;

use crate::frame::{Frame, CHANNELS};
use crate::video::{SinkConfig, SourceConfig, VideoMeta};

/// Frame rate assumed when the container reports none.
const FALLBACK_FPS: u32 = 25;

pub(crate) struct FfmpegSource {
    config: SourceConfig,
    input: ffmpeg::format::context::Input,
    stream_index: usize,
    decoder: ffmpeg::codec::decoder::Video,
    scaler: ffmpeg::software::scaling::Context,
    meta: VideoMeta,
    frames_read: u64,
    flushed: bool,
}

impl FfmpegSource {
    pub(crate) fn open(config: SourceConfig) -> Result<Self> {
        ffmpeg::init().context("initialize ffmpeg")?;
        let input = ffmpeg::format::input(&config.path)
            .with_context(|| format!("failed to open video '{}' with ffmpeg", config.path))?;
        let input_stream = input
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or_else(|| anyhow!("'{}' has no video track", config.path))?;
        let stream_index = input_stream.index();

        let (fps_num, fps_den) = stream_frame_rate(&input_stream);
        let mut frame_count = input_stream.frames().max(0) as u64;
        if frame_count == 0 {
            frame_count = estimate_frame_count(&input_stream, fps_num, fps_den);
        }

        let context = ffmpeg::codec::context::Context::from_parameters(input_stream.parameters())
            .context("load video decoder parameters")?;
        let decoder = context
            .decoder()
            .video()
            .context("open ffmpeg video decoder")?;

        let scaler = ffmpeg::software::scaling::context::Context::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            ffmpeg::util::format::pixel::Pixel::RGB24,
            decoder.width(),
            decoder.height(),
            ffmpeg::software::scaling::flag::Flags::BILINEAR,
        )
        .context("create ffmpeg scaler")?;

        let meta = VideoMeta {
            width: decoder.width(),
            height: decoder.height(),
            fps_num,
            fps_den,
            frame_count,
        };
        log::info!(
            "opened {} ({}x{} @ {:.2} fps, {} frames reported)",
            config.path,
            meta.width,
            meta.height,
            meta.fps(),
            meta.frame_count
        );

        Ok(Self {
            config,
            input,
            stream_index,
            decoder,
            scaler,
            meta,
            frames_read: 0,
            flushed: false,
        })
    }

    pub(crate) fn meta(&self) -> VideoMeta {
        self.meta
    }

    pub(crate) fn next_frame(&mut self) -> Result<Option<Frame>> {
        let mut decoded = ffmpeg::frame::Video::empty();
        loop {
            if self.decoder.receive_frame(&mut decoded).is_ok() {
                return Ok(Some(self.convert(&decoded)?));
            }
            if self.flushed {
                return Ok(None);
            }

            let packet = {
                let mut packets = self.input.packets();
                loop {
                    match packets.next() {
                        Some((stream, packet)) if stream.index() == self.stream_index => {
                            break Some(packet)
                        }
                        Some(_) => continue,
                        None => break None,
                    }
                }
            };

            match packet {
                Some(packet) => {
                    if let Err(err) = self.decoder.send_packet(&packet) {
                        // A failed decode ends the stream rather than the run.
                        log::warn!(
                            "decode error in {}, treating as end of stream: {}",
                            self.config.path,
                            err
                        );
                        let _ = self.decoder.send_eof();
                        self.flushed = true;
                    }
                }
                None => {
                    let _ = self.decoder.send_eof();
                    self.flushed = true;
                }
            }
        }
    }

    fn convert(&mut self, decoded: &ffmpeg::frame::Video) -> Result<Frame> {
        let mut rgb_frame = ffmpeg::frame::Video::empty();
        self.scaler
            .run(decoded, &mut rgb_frame)
            .context("scale frame to RGB")?;
        let (pixels, width, height) = frame_to_pixels(&rgb_frame)?;
        self.frames_read += 1;
        Frame::new(width, height, pixels)
    }
}

fn stream_frame_rate(stream: &ffmpeg::format::stream::Stream) -> (u32, u32) {
    let avg = stream.avg_frame_rate();
    if avg.numerator() > 0 && avg.denominator() > 0 {
        return (avg.numerator() as u32, avg.denominator() as u32);
    }
    let rate = stream.rate();
    if rate.numerator() > 0 && rate.denominator() > 0 {
        return (rate.numerator() as u32, rate.denominator() as u32);
    }
    log::warn!("source reports no frame rate, assuming {} fps", FALLBACK_FPS);
    (FALLBACK_FPS, 1)
}

fn estimate_frame_count(
    stream: &ffmpeg::format::stream::Stream,
    fps_num: u32,
    fps_den: u32,
) -> u64 {
    let duration = stream.duration();
    if duration <= 0 || fps_den == 0 {
        return 0;
    }
    let seconds = duration as f64 * f64::from(stream.time_base());
    let fps = fps_num as f64 / fps_den as f64;
    (seconds * fps).round().max(0.0) as u64
}

fn frame_to_pixels(frame: &ffmpeg::frame::Video) -> Result<(Vec<u8>, u32, u32)> {
    let width = frame.width();
    let height = frame.height();
    let row_bytes = width as usize * CHANNELS;
    let stride = frame.stride(0);
    let data = frame.data(0);

    if stride == row_bytes {
        return Ok((data.to_vec(), width, height));
    }

    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        let end = start + row_bytes;
        pixels.extend_from_slice(
            data.get(start..end)
                .context("ffmpeg frame row is out of bounds")?,
        );
    }

    Ok((pixels, width, height))
}

// ----------------------------------------------------------------------------
// Encoder
// ----------------------------------------------------------------------------

pub(crate) struct FfmpegSink {
    octx: ffmpeg::format::context::Output,
    encoder: ffmpeg::encoder::video::Encoder,
    scaler: ffmpeg::software::scaling::Context,
    stream_index: usize,
    encoder_time_base: ffmpeg::Rational,
    stream_time_base: ffmpeg::Rational,
    meta: VideoMeta,
    path: PathBuf,
    frames_written: u64,
    finished: bool,
}

impl FfmpegSink {
    pub(crate) fn create(config: &SinkConfig) -> Result<Self> {
        ffmpeg::init().context("initialize ffmpeg")?;
        let meta = config.meta;
        let fps = ffmpeg::Rational::new(meta.fps_num as i32, meta.fps_den.max(1) as i32);
        let encoder_time_base = fps.invert();

        let mut octx = ffmpeg::format::output(&config.path)
            .with_context(|| format!("create output container {}", config.path.display()))?;
        let global_header = octx
            .format()
            .flags()
            .contains(ffmpeg::format::Flags::GLOBAL_HEADER);
        let codec = ffmpeg::encoder::find(ffmpeg::codec::Id::MPEG4)
            .ok_or_else(|| anyhow!("ffmpeg build has no MPEG4 encoder"))?;

        let (stream_index, encoder) = {
            let mut ost = octx.add_stream(codec).context("add output video stream")?;
            let mut video = ffmpeg::codec::context::Context::from_parameters(ost.parameters())
                .context("create encoder context")?
                .encoder()
                .video()
                .context("prepare video encoder")?;
            video.set_width(meta.width);
            video.set_height(meta.height);
            video.set_format(ffmpeg::util::format::pixel::Pixel::YUV420P);
            video.set_time_base(encoder_time_base);
            video.set_frame_rate(Some(fps));
            video.set_bit_rate(config.bit_rate);
            if global_header {
                video.set_flags(ffmpeg::codec::Flags::GLOBAL_HEADER);
            }
            let opened = video.open_as(codec).context("open mpeg4 encoder")?;
            ost.set_parameters(&opened);
            (ost.index(), opened)
        };

        octx.write_header().context("write mp4 header")?;
        let stream_time_base = octx
            .stream(stream_index)
            .ok_or_else(|| anyhow!("output stream vanished after header"))?
            .time_base();

        let scaler = ffmpeg::software::scaling::context::Context::get(
            ffmpeg::util::format::pixel::Pixel::RGB24,
            meta.width,
            meta.height,
            ffmpeg::util::format::pixel::Pixel::YUV420P,
            meta.width,
            meta.height,
            ffmpeg::software::scaling::flag::Flags::BILINEAR,
        )
        .context("create RGB to YUV scaler")?;

        Ok(Self {
            octx,
            encoder,
            scaler,
            stream_index,
            encoder_time_base,
            stream_time_base,
            meta,
            path: config.path.clone(),
            frames_written: 0,
            finished: false,
        })
    }

    pub(crate) fn write(&mut self, frame: &Frame) -> Result<()> {
        if frame.width() != self.meta.width || frame.height() != self.meta.height {
            bail!(
                "frame size {}x{} does not match output {}x{}",
                frame.width(),
                frame.height(),
                self.meta.width,
                self.meta.height
            );
        }

        let rgb = pixels_to_frame(frame);
        let mut yuv = ffmpeg::frame::Video::empty();
        self.scaler
            .run(&rgb, &mut yuv)
            .context("convert frame to YUV420P")?;
        yuv.set_pts(Some(self.frames_written as i64));
        self.encoder
            .send_frame(&yuv)
            .context("send frame to mpeg4 encoder")?;
        self.frames_written += 1;
        self.drain_packets()
    }

    pub(crate) fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.encoder.send_eof().context("flush mpeg4 encoder")?;
        self.drain_packets()?;
        self.octx.write_trailer().context("write mp4 trailer")?;
        log::info!(
            "wrote {} frames to {}",
            self.frames_written,
            self.path.display()
        );
        Ok(())
    }

    pub(crate) fn frames_written(&self) -> u64 {
        self.frames_written
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    fn drain_packets(&mut self) -> Result<()> {
        let mut packet = ffmpeg::Packet::empty();
        while self.encoder.receive_packet(&mut packet).is_ok() {
            packet.set_stream(self.stream_index);
            packet.rescale_ts(self.encoder_time_base, self.stream_time_base);
            packet
                .write_interleaved(&mut self.octx)
                .context("write encoded packet")?;
        }
        Ok(())
    }
}

fn pixels_to_frame(frame: &Frame) -> ffmpeg::frame::Video {
    let width = frame.width();
    let height = frame.height();
    let mut out = ffmpeg::frame::Video::new(
        ffmpeg::util::format::pixel::Pixel::RGB24,
        width,
        height,
    );
    let row_bytes = width as usize * CHANNELS;
    let stride = out.stride(0);
    let data = out.data_mut(0);

    if stride == row_bytes {
        data[..row_bytes * height as usize].copy_from_slice(frame.data());
    } else {
        for row in 0..height as usize {
            let dst_start = row * stride;
            let src_start = row * row_bytes;
            data[dst_start..dst_start + row_bytes]
                .copy_from_slice(&frame.data()[src_start..src_start + row_bytes]);
        }
    }

    out
}
