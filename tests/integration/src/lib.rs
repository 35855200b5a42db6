// Licensed under the Apache-2.0 license

mod test_boot_flow;
mod test_flash_files;
mod test_update_scenarios;

#[cfg(test)]
mod test {
    use bootloader_core::flash::emulated_flash::EmulatedFlash;
    use image_builder::{flash_layout_build, FirmwareImage, FlashLayout};
    use log::LevelFilter;
    use simple_logger::SimpleLogger;

    pub(crate) fn init_logger() {
        let _ = SimpleLogger::new().with_level(LevelFilter::Debug).init();
    }

    pub(crate) fn payload(version: u64, len: usize) -> Vec<u8> {
        (0..len)
            .map(|i| (i as u64).wrapping_mul(31).wrapping_add(version) as u8)
            .collect()
    }

    /// A sealed image whose payload depends on the version.
    pub(crate) fn sealed_image(version: u64, len: usize) -> Vec<u8> {
        let payload = payload(version, len);
        FirmwareImage::new(version, &payload)
            .expect("Failed to seal image")
            .to_bytes()
    }

    /// The reference board layout on a single emulated device.
    pub(crate) fn staged_flash(
        layout: &FlashLayout,
        active: Option<&[u8]>,
        candidates: &[(usize, &[u8])],
    ) -> EmulatedFlash {
        let contents =
            flash_layout_build(layout, active, candidates).expect("Failed to stage flash");
        EmulatedFlash::from_bytes(contents, layout.device.erase_size)
    }

    /// Flips one bit of the payload of the image starting at `image_offset`.
    pub(crate) fn corrupt_payload(flash: &EmulatedFlash, image_offset: usize) {
        flash.corrupt(image_offset + flash_image::FIRMWARE_HEADER_SIZE + 3, 0x08);
    }

    /// Flips one bit of the firmware version field, breaking the header
    /// checksum.
    pub(crate) fn corrupt_header(flash: &EmulatedFlash, image_offset: usize) {
        flash.corrupt(image_offset + 8, 0x01);
    }
}
