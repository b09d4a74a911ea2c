//! Integration tests for arpdump
//!
//! Drives the full acquire / walk / format stack over synthetic kernel dumps.

#[cfg(test)]
mod tests {
    use mockall::mock;
    use pretty_assertions::assert_eq;
    use sonic_arpdump::types::{RTF_ANNOUNCE, SIN_PROXY, ift};
    use sonic_arpdump::wire::{RecordBuilder, encode_dump};
    use sonic_arpdump::{
        ArpDump, ArpdumpConfig, ArpdumpError, EntryFormatter, Filter, FormatContext, HostLookup,
        HostnameResolver, InterfaceResolver, RawSnapshot, RecordWalker, StaticHosts,
        StaticInterfaces, StaticSource, acquire_snapshot,
    };
    use std::net::Ipv4Addr;

    mock! {
        Hosts {}
        impl HostnameResolver for Hosts {
            fn reverse_lookup(&self, addr: Ipv4Addr) -> HostLookup;
        }
    }

    mock! {
        Interfaces {}
        impl InterfaceResolver for Interfaces {
            fn index_to_name(&self, index: u32) -> Option<String>;
        }
    }

    const BASELINE: i64 = 86_400;

    fn table() -> Vec<RecordBuilder> {
        vec![
            RecordBuilder::new(Ipv4Addr::new(192, 168, 1, 1))
                .index(1)
                .lladdr(&[0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff]),
            RecordBuilder::new(Ipv4Addr::new(192, 168, 1, 20))
                .index(1)
                .name("em0")
                .expire(BASELINE as u64 + 100)
                .lladdr(&[0x00, 0x0c, 0x29, 0x01, 0x02, 0x03])
                .trailing(16),
            RecordBuilder::new(Ipv4Addr::new(192, 168, 1, 30))
                .index(1)
                .expire(BASELINE as u64 + 3),
            RecordBuilder::new(Ipv4Addr::new(10, 1, 0, 5))
                .index(2)
                .ift(ift::L2VLAN)
                .lladdr(&[0x02, 0x00, 0x00, 0x00, 0x00, 0x05])
                .other(SIN_PROXY)
                .flags(RTF_ANNOUNCE),
            RecordBuilder::new(Ipv4Addr::new(10, 2, 0, 7))
                .index(3)
                .lladdr(&[0x10, 0x00, 0x5a, 0x01, 0x02, 0x03])
                .token_ring(0x0630, &[0x0011, 0x0a22]),
            RecordBuilder::new(Ipv4Addr::new(10, 3, 0, 9))
                .index(4)
                .ift(ift::IEEE1394)
                .lladdr(&[0x00, 0x30, 0x65, 0xff, 0xfe, 0x01, 0x02, 0x03]),
        ]
    }

    fn interfaces() -> StaticInterfaces {
        StaticInterfaces::new()
            .with(1, "em0")
            .with(2, "vlan10")
            .with(3, "tr0")
            .with(4, "fwe0")
    }

    fn render(snapshot: RawSnapshot, filter: &Filter, ctx: &mut FormatContext) -> Vec<String> {
        let hosts = StaticHosts::new();
        let ifs = interfaces();
        let walker = RecordWalker::new(&ifs);
        let formatter = EntryFormatter::new(&hosts, &ifs);

        let mut lines = Vec::new();
        walker
            .enumerate(snapshot, filter, |record| {
                lines.push(formatter.format(record, ctx));
                Ok(())
            })
            .expect("walk succeeds");
        lines
    }

    #[test]
    fn test_full_table_rendering() {
        let snapshot = RawSnapshot::new(encode_dump(&table()));
        let mut ctx = FormatContext::new(false).with_baseline(BASELINE);
        let lines = render(snapshot, &Filter::default(), &mut ctx);

        assert_eq!(
            lines,
            vec![
                "192.168.1.1 (192.168.1.1) at aa:bb:cc:dd:ee:ff on em0 permanent [ethernet]",
                "192.168.1.20 (192.168.1.20) at 00:0c:29:01:02:03 on em0 expires in 100 seconds [ethernet]",
                "192.168.1.30 (192.168.1.30) at (incomplete) on em0 expires in 3 seconds [ethernet]",
                "10.1.0.5 (10.1.0.5) at 02:00:00:00:00:05 on vlan10 permanent published (proxy only) published [vlan]",
                "10.2.0.7 (10.2.0.7) at 10.0.5a.1.2.3 on tr0 permanent [token-ring] rt=630:11:a22",
                "10.3.0.9 (10.3.0.9) at 0.30.65.ff.fe.1.2.3 on fwe0 permanent [firewire]",
            ]
        );
    }

    #[test]
    fn test_formatting_is_idempotent() {
        let mut ctx = FormatContext::new(false).with_baseline(BASELINE);
        let first = render(
            RawSnapshot::new(encode_dump(&table())),
            &Filter::default(),
            &mut ctx,
        );
        let second = render(
            RawSnapshot::new(encode_dump(&table())),
            &Filter::default(),
            &mut ctx,
        );
        assert_eq!(first, second);
    }

    #[test]
    fn test_callback_count_matches_record_count() {
        for count in [0usize, 1, 3, 64, 500] {
            let records: Vec<_> = (0..count)
                .map(|i| {
                    RecordBuilder::new(Ipv4Addr::from(0x0a00_0000 + i as u32))
                        .lladdr(&[0, 0, 0, 0, (i >> 8) as u8, i as u8])
                        .trailing(i % 4 * 8)
                })
                .collect();
            let snapshot = RawSnapshot::new(encode_dump(&records));
            let len = snapshot.len();

            let ifs = StaticInterfaces::new();
            let walker = RecordWalker::new(&ifs);
            let mut calls = 0;
            let outcome = walker
                .enumerate(snapshot, &Filter::default(), |_| {
                    calls += 1;
                    Ok(())
                })
                .unwrap();

            assert_eq!(calls, count);
            assert_eq!(outcome.end_offset, len);
        }
    }

    #[test]
    fn test_address_filter_counts() {
        let ifs = interfaces();
        let walker = RecordWalker::new(&ifs);

        let filter = Filter::default().address(Ipv4Addr::new(10, 1, 0, 5));
        let outcome = walker
            .enumerate(RawSnapshot::new(encode_dump(&table())), &filter, |_| Ok(()))
            .unwrap();
        assert_eq!(outcome.matched(), 1);
        assert_eq!(outcome.visited, 1);

        let filter = Filter::default().address(Ipv4Addr::new(10, 9, 9, 9));
        let outcome = walker
            .enumerate(RawSnapshot::new(encode_dump(&table())), &filter, |_| Ok(()))
            .unwrap();
        assert_eq!(outcome.matched(), 0);
        assert_eq!(outcome.visited, 0);
    }

    #[test]
    fn test_interface_filter_excludes_other_interfaces() {
        let mut ctx = FormatContext::new(false).with_baseline(BASELINE);
        let lines = render(
            RawSnapshot::new(encode_dump(&table())),
            &Filter::default().interface("em0"),
            &mut ctx,
        );
        assert_eq!(lines.len(), 3);
        assert!(lines.iter().all(|l| l.contains(" on em0 ")));
    }

    #[test]
    fn test_reverse_lookup_gives_up_after_retry() {
        let mut hosts = MockHosts::new();
        let mut seq = mockall::Sequence::new();
        hosts
            .expect_reverse_lookup()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| HostLookup::Found("gw.example.net".to_string()));
        hosts
            .expect_reverse_lookup()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| HostLookup::RetryLater);

        let mut ifs = MockInterfaces::new();
        ifs.expect_index_to_name()
            .returning(|index| Some(format!("em{index}")));

        let snapshot = RawSnapshot::new(encode_dump(&table()[..3]));
        let walker = RecordWalker::new(&ifs);
        let formatter = EntryFormatter::new(&hosts, &ifs);
        let mut ctx = FormatContext::new(true).with_baseline(BASELINE);

        let mut names = Vec::new();
        walker
            .enumerate(snapshot, &Filter::default(), |record| {
                let line = formatter.format(record, &mut ctx);
                names.push(line.split(' ').next().unwrap_or_default().to_string());
                Ok(())
            })
            .unwrap();

        assert_eq!(names, vec!["gw.example.net", "?", "192.168.1.30"]);
        assert!(!ctx.resolve_hostnames());
    }

    #[test]
    fn test_arpdump_from_captured_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), encode_dump(&table()[..2])).unwrap();

        let mut dump = ArpDump::new(
            Box::new(StaticSource::from_file(file.path()).unwrap()),
            Box::new(StaticHosts::new()),
            Box::new(interfaces()),
        );
        let mut out = Vec::new();
        let outcome = dump.run(&mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(outcome.visited, 2);
        assert_eq!(text.lines().count(), 2);
        assert!(text.starts_with("192.168.1.1 (192.168.1.1) at aa:bb:cc:dd:ee:ff on em0"));
    }

    #[test]
    fn test_snapshot_growth_during_fetch() {
        let data = encode_dump(&table());
        let mut source = StaticSource::new(data.clone()).with_estimate(data.len() / 2);
        let snapshot = acquire_snapshot(&mut source).unwrap();
        assert_eq!(snapshot.as_bytes(), &data[..]);
        assert!(source.fetches() > 1);
    }

    #[test]
    fn test_corrupt_dump_reports_offset() {
        let mut data = encode_dump(&table()[..2]);
        let first_len = RecordBuilder::new(Ipv4Addr::LOCALHOST).build().len();
        // Declare the second message longer than the buffer
        data[first_len] = 0xff;
        data[first_len + 1] = 0xff;

        let mut dump = ArpDump::new(
            Box::new(StaticSource::new(data)),
            Box::new(StaticHosts::new()),
            Box::new(interfaces()),
        );
        let mut out = Vec::new();
        let err = dump.run(&mut out).unwrap_err();

        match err {
            ArpdumpError::Decode { offset, .. } => assert_eq!(offset, first_len),
            other => panic!("unexpected error: {other}"),
        }
        // Entries before the corruption were still printed
        assert_eq!(String::from_utf8(out).unwrap().lines().count(), 1);
    }

    #[test]
    fn test_config_file_round_trip() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(
            file.path(),
            "[lookup]\nresolve_hostnames = true\n\n[filter]\ninterface = \"em0\"\n",
        )
        .unwrap();

        let config = ArpdumpConfig::load(file.path()).unwrap();
        assert!(config.lookup.resolve_hostnames);
        assert_eq!(config.filter.interface.as_deref(), Some("em0"));
    }
}
